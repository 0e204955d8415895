use ratatui::{
    style::{Color, Style, Stylize},
    text::Line,
    widgets::{Block, Paragraph, Wrap},
};

use trailhead::{client::PageState, store::Bookmarks};

/// Raw markup of the page, with `"<status> - <title>"` on top and the
/// address at the bottom.
pub fn page(page: Option<&PageState>, scroll: (u16, u16)) -> Paragraph<'_> {
    let Some(page) = page else {
        return Paragraph::new("No content")
            .wrap(Wrap { trim: true })
            .block(Block::bordered());
    };
    let title = Line::from(format!("{} - {}", page.status_label, page.title)).bold();
    let style = if page.is_success() {
        Style::new()
    } else {
        Style::new().fg(Color::Red)
    };
    let block = Block::bordered()
        .title_top(title)
        .title_bottom(Line::from(page.url.as_str()));
    Paragraph::new(page.body.as_str())
        .style(style)
        .wrap(Wrap { trim: false })
        .block(block)
        .scroll(scroll)
}

pub fn links(page: Option<&PageState>) -> Paragraph<'_> {
    let lines: Vec<Line> = page
        .map(|page| page.links.as_slice())
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(n, link)| {
            let color = if link.starts_with("https://") {
                Color::Blue
            } else {
                Color::Red
            };
            Line::styled(format!("[{n}] {link}"), Style::new().fg(color))
        })
        .collect();
    Paragraph::new(lines).block(Block::bordered().title_top("Links"))
}

pub fn bookmarks(bookmarks: &Bookmarks) -> Paragraph<'_> {
    let lines: Vec<Line> = bookmarks
        .iter()
        .map(|(name, url)| Line::from(vec![name.as_str().bold(), format!(" {url}").into()]))
        .collect();
    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::bordered().title_top("Bookmarks"))
}

/// Most recent first, the entry on display is marked.
pub fn history(entries: &[String], cursor: Option<usize>) -> Paragraph<'_> {
    let lines: Vec<Line> = entries
        .iter()
        .enumerate()
        .rev()
        .map(|(index, url)| {
            if Some(index) == cursor {
                Line::from(format!("→ [{index}] {url}")).bold()
            } else {
                Line::from(format!("  [{index}] {url}"))
            }
        })
        .collect();
    let title = format!("History ({})", entries.len());
    Paragraph::new(lines).block(Block::bordered().title_top(title))
}
