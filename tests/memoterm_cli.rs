use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn memoterm_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_memoterm").expect("memoterm test binary not built")
}

#[test]
fn memoterm_help_mentions_name() {
    let output = Command::new(memoterm_bin())
        .arg("--help")
        .output()
        .expect("run memoterm --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("memoterm"));
    assert!(combined.contains("--list-input-devices"));
}

#[test]
fn memoterm_list_input_devices_prints_message() {
    let output = Command::new(memoterm_bin())
        .arg("--list-input-devices")
        .output()
        .expect("run memoterm --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(
        combined.contains("audio input devices")
            || combined.contains("Failed to list audio input devices")
    );
}

#[test]
fn memoterm_rejects_invalid_tick() {
    let output = Command::new(memoterm_bin())
        .args(["--tick-ms", "0", "--list-input-devices"])
        .output()
        .expect("run memoterm with bad tick");
    assert!(!output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("--tick-ms"));
}
