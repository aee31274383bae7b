use console::{Emoji, style};

pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static INFO_ICON: Emoji<'_, '_> = Emoji("ℹ️  ", "");
pub static WARN_ICON: Emoji<'_, '_> = Emoji("⚠️  ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

pub fn print_success(msg: &str) {
    println!("{} {}", SUCCESS_ICON, style(msg).green());
}

pub fn print_info(msg: &str) {
    println!("{} {}", INFO_ICON, style(msg).blue());
}

pub fn print_warn(msg: &str) {
    println!("{} {}", WARN_ICON, style(msg).yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

pub fn print_status(label: &str, msg: &str) {
    println!("  {} {}: {}", GEAR, style(label).bold().cyan(), msg);
}

pub fn print_banner() {
    println!();
    println!("{}", style("  gradewatch").bold().cyan());
    println!(
        "{}\n",
        style("  Know the moment your submission is graded.").dim()
    );
}

pub fn print_goodbye() {
    println!("\n{} {}", SPARKLE, style("gradewatch stopped. Bye!").bold().cyan());
}

/// A titled block of aligned lines, used for help and status screens.
pub struct GuideSection {
    title: String,
    lines: Vec<String>,
}

impl GuideSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn command(mut self, name: &str, description: &str) -> Self {
        self.lines.push(format!(
            "  {:<10} {}",
            style(name).green().bold(),
            description
        ));
        self
    }

    pub fn status(mut self, label: &str, value: &str) -> Self {
        self.lines
            .push(format!("  {}: {}", style(label).bold().cyan(), value));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.lines.push(format!("  {}", text));
        self
    }

    pub fn blank(mut self) -> Self {
        self.lines.push(String::new());
        self
    }

    pub fn print(&self) {
        println!("\n{}", style(&self.title).bold().underlined());
        for line in &self.lines {
            println!("{}", line);
        }
    }
}
