use pulldown_cmark::{Options, Parser};

use crate::content::{About, Article, Block, Category};
use crate::normalize::{MediaAsset, media_url};

const STYLESHEET: &str = r#"
:root { color-scheme: light; --fg: #1d1d1f; --muted: #6e6e73; --accent: #4945ff; --line: #e5e5ea; }
* { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, -apple-system, "Segoe UI", sans-serif; color: var(--fg); line-height: 1.6; }
header.site, footer.site { border-bottom: 1px solid var(--line); padding: 1rem 1.5rem; display: flex; gap: 1.5rem; align-items: baseline; }
footer.site { border-top: 1px solid var(--line); border-bottom: none; color: var(--muted); font-size: .875rem; }
header.site a { color: var(--fg); text-decoration: none; font-weight: 600; }
main { max-width: 46rem; margin: 0 auto; padding: 2rem 1.5rem 4rem; }
a { color: var(--accent); }
.preview-banner { background: #fff4d6; border-bottom: 1px solid #f0d58a; padding: .5rem 1.5rem; font-size: .875rem; }
.meta { color: var(--muted); font-size: .9rem; }
.placeholder { color: var(--muted); font-style: italic; }
figure { margin: 2rem 0; }
figure img, .cover img { max-width: 100%; height: auto; border-radius: 6px; }
figcaption { color: var(--muted); font-size: .875rem; margin-top: .5rem; }
blockquote { margin: 2rem 0; padding: .5rem 1.25rem; border-left: 4px solid var(--accent); }
blockquote footer { color: var(--muted); margin-top: .5rem; }
.slider { display: grid; grid-auto-flow: column; grid-auto-columns: 80%; gap: 1rem; overflow-x: auto; scroll-snap-type: x mandatory; }
.slider figure { margin: 0; scroll-snap-align: start; }
pre.block-fallback { background: #f5f5f7; padding: 1rem; overflow-x: auto; font-size: .8rem; }
ul.articles { list-style: none; padding: 0; }
ul.articles li { padding: 1rem 0; border-bottom: 1px solid var(--line); }
"#;

/// Page chrome shared by every rendered page.
#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    pub title: &'a str,
    /// Draft preview is active for this request.
    pub preview: bool,
    pub current_path: &'a str,
    /// Explicit locale override, carried over into site links.
    pub locale: Option<&'a str>,
}

pub fn page(layout: &Layout<'_>, body: &str) -> String {
    let mut out = String::new();
    out.push_str("<!doctype html>\n<html lang=\"");
    out.push_str(&escape(layout.locale.unwrap_or("en")));
    out.push_str("\">\n<head>\n  <meta charset=\"utf-8\">\n");
    out.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str(&format!("  <title>{}</title>\n", escape(layout.title)));
    out.push_str(&format!("  <style>{STYLESHEET}</style>\n"));
    out.push_str("</head>\n<body>\n");

    if layout.preview {
        let exit = format!(
            "/api/preview/disable?{}",
            url::form_urlencoded::Serializer::new(String::new())
                .append_pair("url", layout.current_path)
                .finish()
        );
        out.push_str(&format!(
            "<div class=\"preview-banner\">Preview mode: showing draft content. <a href=\"{}\">Exit preview</a></div>\n",
            escape(&exit)
        ));
    }

    out.push_str("<header class=\"site\">\n");
    out.push_str(&format!(
        "  <a href=\"{}\">Home</a>\n",
        escape(&localized_href("/", layout.locale))
    ));
    out.push_str(&format!(
        "  <a href=\"{}\">About</a>\n",
        escape(&localized_href("/about", layout.locale))
    ));
    out.push_str("</header>\n<main>\n");
    out.push_str(body);
    out.push_str("</main>\n<footer class=\"site\">Content served by Strapi</footer>\n</body>\n</html>\n");
    out
}

pub fn article_body(article: &Article, origin: &str, locale: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str("<article>\n");
    out.push_str(&format!("<h1>{}</h1>\n", escape(&article.title)));

    let mut meta = Vec::new();
    if let Some(author) = article.author.as_ref().and_then(|a| a.name.as_deref()) {
        meta.push(format!("By {}", escape(author)));
    }
    if let Some(published_at) = article.published_at {
        meta.push(format!(
            "<time datetime=\"{}\">{}</time>",
            published_at.to_rfc3339(),
            published_at.format("%B %-d, %Y")
        ));
    }
    if let Some(category) = &article.category {
        let name = category.name.as_deref().unwrap_or("Uncategorized");
        match category.slug.as_deref() {
            Some(slug) => meta.push(format!(
                "in <a href=\"{}\">{}</a>",
                escape(&localized_href(&format!("/category/{slug}"), locale)),
                escape(name)
            )),
            None => meta.push(format!("in {}", escape(name))),
        }
    }
    if !meta.is_empty() {
        out.push_str(&format!("<p class=\"meta\">{}</p>\n", meta.join(" &middot; ")));
    }

    if let Some(description) = &article.description {
        out.push_str(&format!("<p class=\"lead\">{}</p>\n", escape(description)));
    }
    if let Some(cover) = media_url(article.cover.as_ref(), origin) {
        let alt = alt_text(article.cover.as_ref(), &article.title);
        out.push_str(&format!(
            "<div class=\"cover\"><img src=\"{}\" alt=\"{}\"></div>\n",
            escape(&cover),
            escape(&alt)
        ));
    }

    out.push_str(&blocks_html(&article.blocks, origin));
    out.push_str("</article>\n");
    out
}

pub fn about_body(about: &About, origin: &str) -> String {
    format!(
        "<article>\n<h1>{}</h1>\n{}</article>\n",
        escape(&about.title),
        blocks_html(&about.blocks, origin)
    )
}

pub fn category_body(category: &Category, origin: &str, locale: Option<&str>) -> String {
    let mut out = format!("<h1>{}</h1>\n", escape(&category.name));
    if let Some(description) = &category.description {
        out.push_str(&format!("<p class=\"lead\">{}</p>\n", escape(description)));
    }
    out.push_str(&article_list(&category.articles, origin, locale));
    out
}

pub fn index_body(articles: &[Article], origin: &str, locale: Option<&str>) -> String {
    format!(
        "<h1>Latest articles</h1>\n{}",
        article_list(articles, origin, locale)
    )
}

fn article_list(articles: &[Article], origin: &str, locale: Option<&str>) -> String {
    if articles.is_empty() {
        return placeholder("No articles yet.");
    }

    let mut out = String::from("<ul class=\"articles\">\n");
    for article in articles {
        out.push_str("<li>");
        let title = escape(&article.title);
        match article.slug.as_deref() {
            Some(slug) => out.push_str(&format!(
                "<h2><a href=\"{}\">{title}</a></h2>",
                escape(&localized_href(&format!("/blog/{slug}"), locale))
            )),
            None => out.push_str(&format!("<h2>{title}</h2>")),
        }
        if let Some(cover) = media_url(article.cover.as_ref(), origin) {
            let alt = alt_text(article.cover.as_ref(), &article.title);
            out.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\" loading=\"lazy\" width=\"320\">",
                escape(&cover),
                escape(&alt)
            ));
        }
        if let Some(description) = &article.description {
            out.push_str(&format!("<p>{}</p>", escape(description)));
        }
        out.push_str("</li>\n");
    }
    out.push_str("</ul>\n");
    out
}

pub fn not_found_body(what: &str) -> String {
    format!(
        "<h1>Not found</h1>\n<p>The {} you are looking for does not exist or is not available in this status/locale.</p>\n<p><a href=\"/\">Back to home</a></p>\n",
        escape(what)
    )
}

pub fn error_body() -> String {
    "<h1>Something went wrong</h1>\n<p>The content service could not be reached. Please try again later.</p>\n".to_owned()
}

pub fn blocks_html(blocks: &[Block], origin: &str) -> String {
    blocks.iter().map(|block| block_html(block, origin)).collect()
}

pub fn block_html(block: &Block, origin: &str) -> String {
    match block {
        Block::RichText { body } => match body {
            Some(body) => format!("<section class=\"rich-text\">\n{}</section>\n", markdown_html(body)),
            None => placeholder("No content provided."),
        },
        Block::Quote { title, body } => {
            let body = body.as_deref().unwrap_or("No quote provided.");
            let mut out = format!("<blockquote>\n<p>{}</p>\n", escape(body));
            if let Some(title) = title {
                out.push_str(&format!("<footer>&mdash; {}</footer>\n", escape(title)));
            }
            out.push_str("</blockquote>\n");
            out
        }
        Block::Media { file } => match figure_html(file.as_ref(), origin) {
            Some(figure) => figure,
            None => placeholder("No media selected."),
        },
        Block::Slider { files } => {
            let figures: String = files
                .iter()
                .filter_map(|file| figure_html(Some(file), origin))
                .collect();
            if figures.is_empty() {
                placeholder("No slides available.")
            } else {
                format!("<div class=\"slider\">\n{figures}</div>\n")
            }
        }
        Block::Unknown { component, raw } => {
            let dump = serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
            let label = if component.is_empty() {
                "unknown"
            } else {
                component.as_str()
            };
            format!(
                "<pre class=\"block-fallback\" data-component=\"{}\">{}</pre>\n",
                escape(label),
                escape(&dump)
            )
        }
    }
}

fn figure_html(asset: Option<&MediaAsset>, origin: &str) -> Option<String> {
    let src = media_url(asset, origin)?;
    let alt = alt_text(asset, "Media");
    let mut out = format!(
        "<figure>\n<img src=\"{}\" alt=\"{}\" loading=\"lazy\">\n",
        escape(&src),
        escape(&alt)
    );
    if let Some(caption) = asset.and_then(|a| a.caption.as_deref()) {
        out.push_str(&format!("<figcaption>{}</figcaption>\n", escape(caption)));
    }
    out.push_str("</figure>\n");
    Some(out)
}

fn alt_text(asset: Option<&MediaAsset>, fallback: &str) -> String {
    asset
        .and_then(|a| a.alternative_text.as_deref().or(a.name.as_deref()))
        .unwrap_or(fallback)
        .to_owned()
}

fn placeholder(text: &str) -> String {
    format!("<p class=\"placeholder\">{}</p>\n", escape(text))
}

pub fn markdown_html(md: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(md, options);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

/// Appends `locale` to a site path when one was requested explicitly.
pub fn localized_href(path: &str, locale: Option<&str>) -> String {
    match locale {
        Some(locale) => format!(
            "{path}?{}",
            url::form_urlencoded::Serializer::new(String::new())
                .append_pair("locale", locale)
                .finish()
        ),
        None => path.to_owned(),
    }
}

pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const ORIGIN: &str = "http://cms.local";

    fn asset(value: serde_json::Value) -> MediaAsset {
        crate::normalize::first_media_item(&value).unwrap()
    }

    #[test]
    fn rich_text_renders_markdown() {
        let html = block_html(
            &Block::RichText {
                body: Some("Some **bold** text".to_owned()),
            },
            ORIGIN,
        );
        assert!(html.contains("<strong>bold</strong>"), "{html}");
    }

    #[test]
    fn empty_blocks_render_placeholders() {
        assert!(block_html(&Block::RichText { body: None }, ORIGIN).contains("No content provided."));
        assert!(block_html(&Block::Media { file: None }, ORIGIN).contains("No media selected."));
        assert!(block_html(&Block::Slider { files: Vec::new() }, ORIGIN).contains("No slides available."));
        let quote = block_html(&Block::Quote { title: None, body: None }, ORIGIN);
        assert!(quote.contains("No quote provided."));
        assert!(!quote.contains("<footer>"));
    }

    #[test]
    fn quote_shows_attribution() {
        let html = block_html(
            &Block::Quote {
                title: Some("Ada <Lovelace>".to_owned()),
                body: Some("Imagination".to_owned()),
            },
            ORIGIN,
        );
        assert!(html.contains("<p>Imagination</p>"));
        assert!(html.contains("&mdash; Ada &lt;Lovelace&gt;"));
    }

    #[test]
    fn media_alt_text_falls_back_through_name_to_label() {
        let with_alt = asset(json!({ "url": "/a.png", "alternativeText": "Alt", "name": "a.png" }));
        let with_name = asset(json!({ "url": "/a.png", "name": "a.png" }));
        let bare = asset(json!({ "url": "/a.png" }));

        let render = |file: MediaAsset| block_html(&Block::Media { file: Some(file) }, ORIGIN);
        assert!(render(with_alt).contains("alt=\"Alt\""));
        assert!(render(with_name).contains("alt=\"a.png\""));
        let html = render(bare);
        assert!(html.contains("alt=\"Media\""));
        assert!(html.contains("src=\"http://cms.local/a.png\""));
    }

    #[test]
    fn slider_renders_every_asset() {
        let files = vec![asset(json!({ "url": "/a.png" })), asset(json!("https://cdn.example/b.png"))];
        let html = block_html(&Block::Slider { files }, ORIGIN);
        assert_eq!(html.matches("<figure>").count(), 2);
        assert!(html.contains("https://cdn.example/b.png"));
    }

    #[test]
    fn unknown_block_dumps_escaped_json() {
        let html = block_html(
            &Block::Unknown {
                component: "shared.embed".to_owned(),
                raw: json!({ "__component": "shared.embed", "html": "<iframe>" }),
            },
            ORIGIN,
        );
        assert!(html.contains("data-component=\"shared.embed\""));
        assert!(html.contains("&lt;iframe&gt;"));
        assert!(!html.contains("<iframe>"));
    }

    #[test]
    fn preview_banner_links_back_to_current_path() {
        let layout = Layout {
            title: "T",
            preview: true,
            current_path: "/blog/foo?locale=fr",
            locale: Some("fr"),
        };
        let html = page(&layout, "<p>x</p>");
        assert!(html.contains("Preview mode"));
        assert!(html.contains("/api/preview/disable?url=%2Fblog%2Ffoo%3Flocale%3Dfr"));
        assert!(html.contains("href=\"/about?locale=fr\""));

        let html = page(&Layout { preview: false, ..layout }, "<p>x</p>");
        assert!(!html.contains("Preview mode"));
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
