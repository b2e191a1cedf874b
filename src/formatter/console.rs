use super::{Report, Section};
use colored::Colorize;

fn icon(title: &str) -> &'static str {
    match title {
        "Summary" => "📝",
        "Risks" => "⚠️",
        "Files" => "📁",
        "Fixes" => "🔧",
        "Recommendations" => "💡",
        "Peer review" => "👀",
        "Ticket quality" => "🎫",
        "Acceptance criteria" => "☑️",
        "Ticket references" => "🔗",
        "Infrastructure cost" => "💰",
        "Test suggestions" | "Test coverage" => "🧪",
        "Project classification" => "📊",
        "Prompts" | "Prompt details" => "🧾",
        "Warnings" => "🚧",
        _ => "•",
    }
}

fn render_section(out: &mut String, section: &Section) {
    let title = format!("{} {}", icon(section.title), section.title);
    let title = match section.title {
        "Risks" | "Warnings" => title.bright_yellow().bold(),
        _ => title.bright_cyan().bold(),
    };
    out.push_str(&title.to_string());
    out.push('\n');
    out.push_str(&"-".repeat(40).cyan().to_string());
    out.push('\n');

    if let Some(body) = &section.body {
        out.push_str(body);
        out.push('\n');
    }
    for item in &section.items {
        let mut lines = item.lines();
        if let Some(first) = lines.next() {
            out.push_str(&format!("   • {}\n", first));
        }
        for rest in lines {
            out.push_str(&format!("     {}\n", rest.dimmed()));
        }
    }
    if section.omitted > 0 {
        out.push_str(&format!("   {}\n", format!("… and {} more", section.omitted).dimmed()));
    }
    out.push('\n');
}

pub fn render(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(&format!("🔍 {}", report.heading).bright_blue().bold().to_string());
    out.push('\n');
    out.push_str(&"=".repeat(60).cyan().to_string());
    out.push_str("\n\n");

    for section in &report.sections {
        render_section(&mut out, section);
    }
    out
}
