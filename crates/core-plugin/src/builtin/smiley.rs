use crate::{Plugin, PluginApi, PluginEvent, callback};

pub const SMILEY: &str = "\u{1F60A}";

const EMOTICON: &str = ":-)";

/// Replaces the `:-)` emoticon with an emoji as it is typed.
pub struct SmileyPlugin;

impl Plugin for SmileyPlugin {
    fn name(&self) -> &'static str {
        "Smiley Emoji Script"
    }

    fn start(&self, api: &mut dyn PluginApi) -> anyhow::Result<()> {
        api.add_text_change_callback(
            EMOTICON,
            callback(|api, event| {
                let detect = match event {
                    PluginEvent::TextDetected { detect } => detect.as_str(),
                    _ => EMOTICON,
                };
                replace_emoticons(api, detect);
                Ok(())
            }),
        );
        api.display_in_list_view(self.name());
        Ok(())
    }
}

/// Replace every `detect` with [`SMILEY`] and put the caret right after the
/// char that was just typed, measured in the rewritten text.
fn replace_emoticons(api: &mut dyn PluginApi, detect: &str) {
    let text = api.text();
    let typed_end = (api.caret_position() + 1).min(text.chars().count());
    let split = text
        .char_indices()
        .nth(typed_end)
        .map_or(text.len(), |(b, _)| b);
    let head = text[..split].replace(detect, SMILEY);
    let tail = text[split..].replace(detect, SMILEY);
    api.set_text(&format!("{head}{tail}"));
    api.set_caret_position(head.chars().count());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingApi;
    use pretty_assertions::assert_eq;

    fn type_str(api: &mut RecordingApi, s: &str) {
        for c in s.chars() {
            api.type_char(c);
        }
    }

    #[test]
    fn typed_emoticon_becomes_emoji() {
        let mut api = RecordingApi::default();
        SmileyPlugin.start(&mut api).unwrap();
        type_str(&mut api, "hi :-)");
        assert_eq!(api.buffer.text(), format!("hi {SMILEY}"));
        assert_eq!(api.buffer.caret(), 4);
        type_str(&mut api, "!");
        assert_eq!(api.buffer.text(), format!("hi {SMILEY}!"));
    }

    #[test]
    fn replacement_mid_text_keeps_caret_after_emoji() {
        let mut api = RecordingApi::with_text("ab", 1);
        SmileyPlugin.start(&mut api).unwrap();
        type_str(&mut api, ":-)");
        assert_eq!(api.buffer.text(), format!("a{SMILEY}b"));
        assert_eq!(api.buffer.caret(), 2);
    }

    #[test]
    fn partial_emoticon_is_left_alone() {
        let mut api = RecordingApi::default();
        SmileyPlugin.start(&mut api).unwrap();
        type_str(&mut api, ":-(");
        assert_eq!(api.buffer.text(), ":-(");
        assert_eq!(api.buffer.caret(), 3);
    }
}
