use quick_xml::escape::escape;

use crate::foundation::locale;

/// Values substituted into the cover template. Strings are raw (unescaped).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverFields<'a> {
    /// Already formatted session date.
    pub date: &'a str,
    /// Session time or the "not informed" label.
    pub time: &'a str,
    pub client_name: &'a str,
    pub therapist_name: &'a str,
    /// Background image reference (URL, `data:` URI or path).
    pub background_image: &'a str,
}

/// Build the SVG cover fragment at `width`x`height` layout pixels.
///
/// Layout: darkened full-bleed background, title block at the top, emblem in the middle, session
/// details and issuer at the bottom, all inside a 40 px padding.
pub fn cover_markup(fields: &CoverFields<'_>, width: u32, height: u32) -> String {
    let w = width as f32;
    let h = height as f32;
    let pad = 40.0;
    let cx = w / 2.0;
    let cy = h / 2.0;
    let right = w - pad;
    let bottom = h - pad;

    let bg = escape(fields.background_image);
    let date = escape(fields.date);
    let time = escape(fields.time);
    let client = escape(fields.client_name);
    let therapist = escape(fields.therapist_name);
    let title = escape(locale::COVER_TITLE);
    let subtitle = escape(locale::COVER_SUBTITLE);
    let tagline = escape(locale::COVER_TAGLINE);
    let issued_by = escape(locale::COVER_ISSUED_BY);

    let background = if fields.background_image.trim().is_empty() {
        String::new()
    } else {
        format!(
            r#"<image href="{bg}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="xMidYMid slice"/>"#
        )
    };

    let row = |y: f32, label: &str, value: &str| {
        format!(
            r#"<text x="{pad}" y="{y}" font-size="14">{label}</text><text x="{right}" y="{y}" font-size="14" text-anchor="end">{value}</text>"#
        )
    };
    let rows = [
        row(bottom - 112.0, "DATA:", &date),
        row(bottom - 87.0, "HORÁRIO:", &time),
        row(bottom - 62.0, "CLIENTE:", &client),
    ]
    .concat();

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
<defs>
<filter id="shadow" x="-10%" y="-50%" width="120%" height="200%"><feDropShadow dx="2" dy="2" stdDeviation="2" flood-color="#000000" flood-opacity="0.5"/></filter>
<linearGradient id="gold" x1="0" y1="1" x2="1" y2="0"><stop offset="0" stop-color="#ffd700" stop-opacity="0.5"/><stop offset="1" stop-color="#ffa500" stop-opacity="0.5"/></linearGradient>
</defs>
{background}
<rect x="0" y="0" width="{w}" height="{h}" fill="#000000" fill-opacity="0.4"/>
<g font-family="Arial, Helvetica, sans-serif" fill="#ffffff">
<text x="{cx}" y="{title_y}" font-size="28" font-weight="bold" text-anchor="middle" filter="url(#shadow)">{title}</text>
<g font-size="14" text-anchor="middle" fill-opacity="0.9">
<text x="{cx}" y="{sub_y}">{subtitle}</text>
<text x="{cx}" y="{tag_y}">{tagline}</text>
</g>
<circle cx="{cx}" cy="{cy}" r="60" fill="#ffffff" fill-opacity="0.2" stroke="#ffffff" stroke-opacity="0.3"/>
<circle cx="{cx}" cy="{cy}" r="45" fill="url(#gold)"/>
<text x="{cx}" y="{glyph_y}" font-size="32" text-anchor="middle">✦</text>
{rows}
<text x="{right}" y="{issued_y}" font-size="12" text-anchor="end" fill-opacity="0.75">{issued_by}</text>
<text x="{right}" y="{bottom}" font-size="14" font-weight="bold" text-anchor="end">{therapist}</text>
</g>
</svg>"##,
        title_y = pad + 28.0,
        sub_y = pad + 68.0,
        tag_y = pad + 90.0,
        glyph_y = cy + 11.0,
        issued_y = bottom - 22.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields<'a>(client: &'a str, bg: &'a str) -> CoverFields<'a> {
        CoverFields {
            date: "01/05/2024",
            time: "Não informado",
            client_name: client,
            therapist_name: "Joana",
            background_image: bg,
        }
    }

    #[test]
    fn markup_carries_every_field() {
        let svg = cover_markup(&fields("Ana", "https://example.test/bg.jpg"), 794, 1123);
        for needle in [
            "01/05/2024",
            "Não informado",
            "Ana",
            "Joana",
            r#"href="https://example.test/bg.jpg""#,
            "RELATÓRIO TERAPÊUTICO",
            r#"viewBox="0 0 794 1123""#,
        ] {
            assert!(svg.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn values_are_escaped() {
        let svg = cover_markup(
            &fields("<Ana & \"Bia\">", "https://a.test/x.jpg?w=1&h=2"),
            794,
            1123,
        );
        assert!(svg.contains("&lt;Ana &amp; &quot;Bia&quot;&gt;"));
        assert!(svg.contains("x.jpg?w=1&amp;h=2"));
        assert!(!svg.contains("<Ana"));
    }

    #[test]
    fn background_reference_survives_escaping() {
        let url = "https://a.test/x.jpg?w=1&h=2&name='capa'";
        let svg = cover_markup(&fields("Ana", url), 794, 1123);
        assert_eq!(crate::render::markup::external_hrefs(&svg), [url]);
    }

    #[test]
    fn empty_background_omits_image_element() {
        let svg = cover_markup(&fields("Ana", ""), 794, 1123);
        assert!(!svg.contains("<image"));
    }

    #[test]
    fn markup_parses_as_svg() {
        let svg = cover_markup(&fields("Ana", ""), 794, 1123);
        let tree = usvg::Tree::from_str(&svg, &usvg::Options::default()).unwrap();
        assert_eq!(tree.size().width(), 794.0);
    }
}
