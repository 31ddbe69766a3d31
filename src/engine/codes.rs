use crate::registry::CodeSpec;

/// Render a sequence number as a display code: prefix plus zero-padded
/// number. Numbers wider than the pad grow naturally (`STF999` is
/// followed by `STF1000`).
pub fn format_code(spec: &CodeSpec, number: u64) -> String {
    format!("{}{:0width$}", spec.prefix, number, width = spec.width)
}
