//! The `qmtrainer init` command.

use anyhow::Result;

use qmtrainer_core::parser::protocol_to_toml;
use qmtrainer_core::protocol::Protocol;

pub fn execute() -> Result<()> {
    if std::path::Path::new("qmtrainer.toml").exists() {
        println!("qmtrainer.toml already exists, skipping.");
    } else {
        std::fs::write("qmtrainer.toml", SAMPLE_CONFIG)?;
        println!("Created qmtrainer.toml");
    }

    std::fs::create_dir_all("protocols")?;
    let protocol_path = std::path::Path::new("protocols/reference.toml");
    if protocol_path.exists() {
        println!("protocols/reference.toml already exists, skipping.");
    } else {
        std::fs::write(protocol_path, protocol_to_toml(&Protocol::reference())?)?;
        println!("Created protocols/reference.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set `trainer` in qmtrainer.toml (or export QMTRAINER_TRAINER)");
    println!("  2. Run: qmtrainer protocol");
    println!("  3. Run: qmtrainer reenter --disponent NAME --time \"Anrufannahme=8\"");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# qmtrainer configuration

# Where sessions are stored ("json" keeps one file per session).
# "memory" forgets every session when the command exits; use it for tests only.
store = "json"
data_dir = "./qmtrainer-data"

# Identity recorded on every session you evaluate.
trainer = "${USER}"

# Evaluate against a custom protocol instead of the built-in one.
# protocol = "protocols/reference.toml"
# pass_threshold = 35
"#;
