use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Create config template if it doesn't exist
    let out_dir = env::var("OUT_DIR").unwrap_or_else(|_| "./".to_string());
    let template_path = Path::new(&out_dir).join("../../../config.template.toml");

    let template = r#"# RTP Display Configuration Template
# Copy this file to 'config.toml' and fill in your actual values

# Stream destination (rtmp:// or rtmps://)
endpoint = "rtmp://localhost:1935/live/stream"

# Title of status notifications
notification_title = "RTP Display Stream"
"#;

    let _ = fs::write(template_path, template);
    println!("cargo:rerun-if-changed=build.rs");
}
