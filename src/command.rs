/// The two user-facing commands the opener registers with its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenerCommand {
    /// `box`: start scanning, or stop if already scanning/armed.
    Toggle,
    /// `boxdelay [ms]`: set the pacing delay, or report it when the
    /// argument is missing or not a non-negative integer.
    Delay(Option<u64>),
}

/// Parse one command line. Returns `None` when the line is not one of
/// the opener's commands.
pub fn parse_command(line: &str) -> Option<OpenerCommand> {
    let mut parts = line.trim().split_whitespace();
    let name = parts.next()?;
    match name.to_ascii_lowercase().as_str() {
        "box" => Some(OpenerCommand::Toggle),
        "boxdelay" => {
            let value = parts.next().and_then(|arg| arg.parse::<u64>().ok());
            Some(OpenerCommand::Delay(value))
        }
        _ => None,
    }
}
