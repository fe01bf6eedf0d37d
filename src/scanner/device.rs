//! Parsing of `scanimage` listings used for device and source auto-discovery.

/// Device names from `scanimage -L` output.
///
/// Lines look like ``device `brother4:net1;dev0' is a Brother MFC-L2700DW``.
#[must_use]
pub fn parse_device_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("device `")?;
            let end = rest.find("' is")?;
            Some(rest[..end].to_string())
        })
        .collect()
}

/// First duplex-capable value of the `--source` option in `scanimage -A` output.
///
/// The option line lists choices separated by `|`, followed by the current
/// value in brackets:
///
/// ```text
///     --source Flatbed|Automatic Document Feeder(left aligned,Duplex) [Flatbed]
/// ```
#[must_use]
pub fn parse_duplex_source(output: &str) -> Option<String> {
    let line = output
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("--source "))?;
    let choices = match line.rfind(" [") {
        Some(idx) => &line[..idx],
        None => line,
    };
    choices
        .split('|')
        .map(str::trim)
        .find(|choice| choice.to_ascii_lowercase().contains("duplex"))
        .map(str::to_string)
}
