//! HTML and XML: tags stripped, script/style bodies dropped

use super::framework::{Extraction, Extractor};

pub struct MarkupExtractor;

impl Extractor for MarkupExtractor {
    fn format_name(&self) -> &str {
        "markup"
    }

    fn file_extensions(&self) -> &[&str] {
        &["html", "htm", "xhtml", "xml", "svg", "rss", "atom"]
    }

    fn extract(&self, content: &str) -> Extraction {
        Extraction {
            text: strip_tags(content),
            title: element_text(content, "title"),
            author: meta_content(content, "author"),
            subject: meta_content(content, "description"),
        }
    }
}

/// Remove markup, keeping text nodes separated by newlines at tag boundaries
pub fn strip_tags(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len() / 2);
    let mut i = 0;

    while i < input.len() {
        let rest = &input[i..];
        if !rest.starts_with('<') {
            let next = rest.find('<').unwrap_or(rest.len());
            out.push_str(&decode_entities(&rest[..next]));
            i += next;
            continue;
        }

        // Comments and CDATA
        if rest.starts_with("<!--") {
            i += rest.find("-->").map(|p| p + 3).unwrap_or(rest.len());
            continue;
        }
        if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
            let end = cdata.find("]]>").unwrap_or(cdata.len());
            out.push_str(&cdata[..end]);
            i += 9 + (end + 3).min(cdata.len());
            continue;
        }

        let tag_end = rest.find('>').map(|p| p + 1).unwrap_or(rest.len());
        let tag_name: String = lower[i + 1..i + tag_end]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        i += tag_end;

        if tag_name == "script" || tag_name == "style" {
            let close = format!("</{}", tag_name);
            match lower[i..].find(&close) {
                Some(pos) => {
                    i += pos;
                    i += input[i..].find('>').map(|p| p + 1).unwrap_or(input.len() - i);
                }
                None => i = input.len(),
            }
        }
        out.push('\n');
    }

    out.lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn element_text(input: &str, name: &str) -> Option<String> {
    let lower = input.to_ascii_lowercase();
    let open = lower.find(&format!("<{}", name))?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find(&format!("</{}", name))?;
    let text = decode_entities(input[start..end].trim());
    (!text.is_empty()).then_some(text)
}

/// `<meta name="..." content="...">`
fn meta_content(input: &str, name: &str) -> Option<String> {
    let lower = input.to_ascii_lowercase();
    let needle = format!("name=\"{}\"", name);
    let mut from = 0;
    while let Some(pos) = lower[from..].find("<meta") {
        let start = from + pos;
        let end = start + lower[start..].find('>')?;
        let tag = &lower[start..end];
        if tag.contains(&needle) {
            let c = tag.find("content=\"")? + 9;
            let len = tag[c..].find('"')?;
            let value = input[start + c..start + c + len].trim().to_string();
            return (!value.is_empty()).then_some(value);
        }
        from = end;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags() {
        let html = r#"<html><head><title>Plan</title><style>p { color: red; }</style>
            <script>var x = "<b>";</script></head>
            <body><h1>Roadmap</h1><p>Ship &amp; measure</p><!-- hidden --></body></html>"#;
        let text = strip_tags(html);
        assert_eq!(text, "Plan\nRoadmap\nShip & measure");
    }

    #[test]
    fn test_extract_metadata() {
        let html = r#"<html><head><title>Budget 2024</title>
            <meta name="author" content="Sam Lee"><meta name="description" content="Yearly budget">
            </head><body>numbers</body></html>"#;
        let ext = MarkupExtractor.extract(html);
        assert_eq!(ext.title.as_deref(), Some("Budget 2024"));
        assert_eq!(ext.author.as_deref(), Some("Sam Lee"));
        assert_eq!(ext.subject.as_deref(), Some("Yearly budget"));
    }

    #[test]
    fn test_xml_cdata() {
        let xml = "<note><to>Tove</to><body><![CDATA[Don't <forget>]]></body></note>";
        assert_eq!(strip_tags(xml), "Tove\nDon't <forget>");
    }
}
