//! Styled terminal messages.

use console::style;

/// Whether `NO_COLOR` asks for plain output.
#[must_use]
pub fn is_color_disabled() -> bool {
    std::env::var_os("NO_COLOR").is_some()
}

/// Print a section header.
pub fn print_header(text: &str) {
    if is_color_disabled() {
        println!("=== {text} ===");
    } else {
        println!("{}", style(format!("=== {text} ===")).bold().cyan());
    }
}

/// Print a success message.
pub fn print_success(text: &str) {
    if is_color_disabled() {
        println!("[OK] {text}");
    } else {
        println!("{} {text}", style("[OK]").green().bold());
    }
}

/// Print an error to stderr.
pub fn print_error(text: &str) {
    if is_color_disabled() {
        eprintln!("[ERROR] {text}");
    } else {
        eprintln!("{} {text}", style("[ERROR]").red().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printers_do_not_panic() {
        print_header("Calibration c = 0.5");
        print_success("6 experiments recorded");
        print_error("fingerprint mismatch");
    }

    #[test]
    fn printers_accept_unicode() {
        print_header("B\u{1d07}\u{1d0d}\u{1d05} \u{2192} Bconf");
        print_success("");
    }
}
