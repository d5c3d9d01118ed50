use crate::{Plugin, PluginApi, callback};
use core_events::KeyCode;
use tracing::debug;

/// Prompts for a query and highlights its next occurrence after the caret,
/// matching under compatibility normalization.
pub struct FindPlugin;

impl Plugin for FindPlugin {
    fn name(&self) -> &'static str {
        "Find Plug-in"
    }

    fn start(&self, api: &mut dyn PluginApi) -> anyhow::Result<()> {
        api.add_button("Find", callback(|api, _| find_next(api)));
        api.add_key_press_callback(KeyCode::F(3), callback(|api, _| find_next(api)));
        api.display_in_list_view(self.name());
        Ok(())
    }
}

fn find_next(api: &mut dyn PluginApi) -> anyhow::Result<()> {
    let Some(query) = api.show_dialog() else {
        debug!(target: "search", "find_cancelled");
        return Ok(());
    };
    if query.is_empty() {
        return Ok(());
    }
    let caret = api.caret_position();
    match core_search::find(&api.text(), caret, &query) {
        Some(range) => api.highlight_text(range.start, range.end),
        None => debug!(target: "search", caret, query_len = query.chars().count(), "no_match"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingApi;
    use pretty_assertions::assert_eq;

    fn started(text: &str, caret: usize) -> RecordingApi {
        let mut api = RecordingApi::with_text(text, caret);
        FindPlugin.start(&mut api).unwrap();
        api
    }

    #[test]
    fn ligature_highlight_covers_one_original_char() {
        let mut api = started("\u{FB01}sh", 0);
        api.answers.push_back(Some("fi".into()));
        api.press_button("Find");
        assert_eq!(api.highlights, vec![(0, 1)]);
    }

    #[test]
    fn repeated_find_continues_after_previous_match() {
        let mut api = started("Abc abc", 0);
        api.answers.extend([Some("ABC".to_string()), Some("abc".to_string())]);
        api.press_key(KeyCode::F(3));
        api.press_key(KeyCode::F(3));
        assert_eq!(api.highlights, vec![(0, 3), (4, 7)]);
        assert_eq!(api.buffer.caret(), 7);
    }

    #[test]
    fn cancel_and_empty_query_do_nothing() {
        let mut api = started("abc", 0);
        api.answers.extend([None, Some(String::new())]);
        api.press_button("Find");
        api.press_button("Find");
        assert!(api.highlights.is_empty());
    }

    #[test]
    fn no_match_leaves_selection_alone() {
        let mut api = started("   ", 0);
        api.answers.push_back(Some("x".into()));
        api.press_button("Find");
        assert!(api.highlights.is_empty());
        assert_eq!(api.buffer.selection(), None);
    }

    #[test]
    fn announces_itself() {
        let api = started("", 0);
        assert_eq!(api.list_view, vec!["Find Plug-in"]);
        assert_eq!(api.bus.len(), 2);
    }
}
