use super::{Report, Section};

fn render_section(out: &mut String, section: &Section) {
    out.push_str(&format!("## {}\n\n", section.title));
    if let Some(body) = &section.body {
        out.push_str(body);
        out.push_str("\n\n");
    }
    if section.items.is_empty() && section.omitted == 0 {
        return;
    }
    for item in &section.items {
        // Continuation lines stay inside the list item.
        let item = item.replace('\n', "\n  ");
        out.push_str(&format!("- {}\n", item));
    }
    if section.omitted > 0 {
        out.push_str(&format!("- _… and {} more_\n", section.omitted));
    }
    out.push('\n');
}

pub fn render(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", report.heading));
    for section in &report.sections {
        render_section(&mut out, section);
    }
    out
}
