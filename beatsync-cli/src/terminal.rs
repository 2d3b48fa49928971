// ============================================================================
// beatsync-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: Sections, Status Lines and Errors
//
// Human-facing output of the CLI. Everything here goes to stdout except
// errors, which go to stderr. Styling comes from `console` and is dropped
// automatically when the stream is not a terminal.

use console::style;

/// Styling constants for terminal output
pub mod styling {
    pub const SUCCESS_SYMBOL: &str = "✓";
    pub const PROCESSING_SYMBOL: &str = "»";
    pub const ERROR_SYMBOL: &str = "✗";

    pub const SECTION_PREFIX: &str = "===== ";
    pub const SECTION_SUFFIX: &str = " =====";

    pub const STATUS_INDENT: &str = "  ";
    /// Width the status labels are padded to.
    pub const LABEL_WIDTH: usize = 16;
}

/// Prints a section header, e.g. `===== INITIALIZATION =====`.
pub fn print_section(title: &str) {
    println!();
    println!(
        "{}",
        style(format!("{}{}{}", styling::SECTION_PREFIX, title, styling::SECTION_SUFFIX)).bold()
    );
}

/// Prints a `label: value` line; highlighted values are bold.
pub fn print_status(label: &str, value: &str, highlight: bool) {
    let label = format!("{}:", label);
    let value = if highlight {
        style(value).bold().to_string()
    } else {
        value.to_string()
    };
    println!(
        "{}{:<width$} {}",
        styling::STATUS_INDENT,
        label,
        value,
        width = styling::LABEL_WIDTH
    );
}

pub fn print_processing(message: &str) {
    println!("{} {}", style(styling::PROCESSING_SYMBOL).cyan(), message);
}

pub fn print_success(message: &str) {
    println!("{} {}", style(styling::SUCCESS_SYMBOL).green().bold(), message);
}

/// Prints an error block to stderr.
pub fn print_error(title: &str, message: &str, suggestion: Option<&str>) {
    eprintln!();
    eprintln!("{} {}", style(styling::ERROR_SYMBOL).red().bold(), style(title).red().bold());
    eprintln!("{}{}", styling::STATUS_INDENT, message);
    if let Some(suggestion) = suggestion {
        eprintln!("{}{}", styling::STATUS_INDENT, style(suggestion).dim());
    }
}
