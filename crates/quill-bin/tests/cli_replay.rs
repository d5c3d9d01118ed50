//! Runs the `quill` binary against a scratch directory and checks stdout.

use pretty_assertions::assert_eq;
use std::path::Path;
use std::process::Command;

fn quill(dir: &Path, args: &[&str]) -> String {
    let out = Command::new(env!("CARGO_BIN_EXE_quill"))
        .current_dir(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn quill");
    assert!(
        out.status.success(),
        "quill failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8(out.stdout).expect("utf-8 stdout")
}

#[test]
fn keymap_rules_and_smiley_apply_during_replay() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "one\ntwo").unwrap();
    std::fs::write(
        dir.path().join("quill.toml"),
        "[plugins]\nenabled = [\"smiley\", \"find\"]\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("keymap.toml"),
        "[[binding]]\nliteral = \"> \"\nctrl = true\nkey = \"Q\"\nanchor = \"start\"\ntask = \"insert\"\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("session.txt"),
        "# quote the second line, then smile\ncaret 7\nkey ctrl+q\ntype  :-)\nquit\n",
    )
    .unwrap();

    let stdout = quill(dir.path(), &["notes.txt", "--script", "session.txt"]);
    assert_eq!(stdout, "one\n> two \u{1F60A}");
}

#[test]
fn find_answer_is_consumed_by_the_find_button() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("doc.txt"), "\u{FB01}sh").unwrap();
    // Typing lands right after the highlighted ligature.
    std::fs::write(
        dir.path().join("s.txt"),
        "answer fi\nbutton Find\ntype !\n",
    )
    .unwrap();
    let stdout = quill(dir.path(), &["doc.txt", "--script", "s.txt"]);
    assert_eq!(stdout, "\u{FB01}!sh");
}

#[test]
fn missing_keymap_still_runs_plugins() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("s.txt"), "type hi :-)\nkey ctrl+q\n").unwrap();
    let stdout = quill(
        dir.path(),
        &["--script", "s.txt", "--keymap", "absent.toml"],
    );
    assert_eq!(stdout, "hi \u{1F60A}");
}
