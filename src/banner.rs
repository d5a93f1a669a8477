//! Startup banner and session summary display.

use crate::consts::{format_ms, format_number};
use crate::sequencer::{Granularity, SequenceConfig};

/// Session configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub config: &'a SequenceConfig,
    /// Preset name, if the config came from one.
    pub preset: Option<&'a str>,
}

fn mode_label(config: &SequenceConfig) -> &'static str {
    match (config.enabled, config.looping) {
        (false, _) => "static",
        (true, true) => "loop",
        (true, false) => "once",
    }
}

fn unit_label(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::CodePoint => "code points",
        Granularity::Grapheme => "graphemes",
    }
}

/// Render the banner text.
pub fn banner_text(info: &BannerInfo) -> String {
    let config = info.config;
    format!(
        r#"
   ╔═══════════════════════════════════════╗
   ║              T Y P I S T              ║
   ║        letters in, letters out        ║
   ╚═══════════════════════════════════════╝

   version   {}
   preset    {}
   mode      {}
   units     {}
   type      {} / char
   delete    {} / char
   hold      {}
   start     {}
   restart   {}
"#,
        env!("CARGO_PKG_VERSION"),
        info.preset.unwrap_or("—"),
        mode_label(config),
        unit_label(config.granularity),
        format_ms(config.type_interval_ms),
        format_ms(config.delete_interval_ms),
        format_ms(config.hold_ms),
        format_ms(config.start_delay_ms),
        format_ms(config.restart_pause_ms),
    )
}

/// Print the startup banner with session info.
pub fn print_banner(info: &BannerInfo) {
    println!("{}", banner_text(info));
}

/// Print the session summary (frames + cycles + farewell).
pub fn print_session_summary(frames: u64, cycles: u64) {
    if frames > 0 {
        println!(
            "session: {:>6} frames, {:>4} cycles",
            format_number(frames),
            format_number(cycles),
        );
    }
    println!("goodbye.");
}
