use mie_core::messaging::card::StatusCard;

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Telegram has no embeds, so a card becomes a few lines of HTML.
pub fn render_card(card: &StatusCard) -> String {
    let mut out = escape_html(&card.text);
    if !card.fields.is_empty() {
        out.push('\n');
        for f in &card.fields {
            out.push_str(&format!(
                "\n<b>{}</b>: {}",
                escape_html(&f.name),
                escape_html(&f.value)
            ));
        }
    }
    if let Some(at) = card.timestamp {
        out.push_str(&format!("\n<i>{}</i>", at.format("%Y-%m-%d %H:%M UTC")));
    }
    out
}
