use supfeed_core::Param;

use crate::text::{html_to_text, xml_escape};

const DEFAULT_CONTACT_BLOCK: &str = concat!(
    "<p><strong>Оформите заказ в WhatsApp</strong>: напишите нам, ",
    "и менеджер подтвердит наличие и сроки поставки.</p>",
);

const DEFAULT_TERMS_BLOCK: &str = concat!(
    "<h3>Оплата и доставка</h3>",
    "<ul>",
    "<li>Оплата наличными, картой или безналичным переводом для юридических лиц.</li>",
    "<li>Доставка по Алматы курьером, по Казахстану транспортными компаниями.</li>",
    "<li>Самовывоз со склада после подтверждения заказа.</li>",
    "</ul>",
);

/// Fixed blocks wrapped around every offer description of one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionTemplate {
    pub contact_block: String,
    pub terms_block: String,
}

impl Default for DescriptionTemplate {
    fn default() -> Self {
        Self {
            contact_block: DEFAULT_CONTACT_BLOCK.to_string(),
            terms_block: DEFAULT_TERMS_BLOCK.to_string(),
        }
    }
}

/// Builds the HTML placed inside an offer's `<description>`.
///
/// Block order is contact, `<hr>`, the native section (`<h3>` title and a
/// `<p>` with the supplier text flattened and escaped, one `<br>` per line),
/// the characteristics list, then the terms block. The characteristics
/// list is left out when `params` is empty; the native `<p>` is always
/// present, even when empty.
#[must_use]
pub fn build_description(
    name: &str,
    native_description: &str,
    params: &[Param],
    template: &DescriptionTemplate,
) -> String {
    let paragraph = html_to_text(native_description)
        .lines()
        .map(|line| xml_escape(line).into_owned())
        .collect::<Vec<_>>()
        .join("<br>");

    let mut out = String::with_capacity(
        template.contact_block.len() + template.terms_block.len() + paragraph.len() + 256,
    );
    out.push_str(&template.contact_block);
    out.push_str("<hr>");
    out.push_str("<h3>");
    out.push_str(&xml_escape(name));
    out.push_str("</h3><p>");
    out.push_str(&paragraph);
    out.push_str("</p>");

    if !params.is_empty() {
        out.push_str("<h3>Характеристики</h3><ul>");
        for param in params {
            out.push_str("<li><strong>");
            out.push_str(&xml_escape(&param.name));
            out.push_str(":</strong> ");
            out.push_str(&xml_escape(&param.value));
            out.push_str("</li>");
        }
        out.push_str("</ul>");
    }

    out.push_str(&template.terms_block);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> DescriptionTemplate {
        DescriptionTemplate {
            contact_block: "<p>CONTACT</p>".to_string(),
            terms_block: "<p>TERMS</p>".to_string(),
        }
    }

    #[test]
    fn blocks_appear_in_fixed_order() {
        let html = build_description(
            "Картридж HP 85A",
            "<p>Оригинальный.</p><p>Ресурс 1600 стр.</p>",
            &[Param::new("Цвет", "черный")],
            &template(),
        );
        assert_eq!(
            html,
            "<p>CONTACT</p><hr><h3>Картридж HP 85A</h3>\
             <p>Оригинальный.<br>Ресурс 1600 стр.</p>\
             <h3>Характеристики</h3><ul><li><strong>Цвет:</strong> черный</li></ul>\
             <p>TERMS</p>"
        );
    }

    #[test]
    fn empty_native_description_keeps_empty_paragraph() {
        let html = build_description("Бумага A4", "", &[], &template());
        assert_eq!(html, "<p>CONTACT</p><hr><h3>Бумага A4</h3><p></p><p>TERMS</p>");
    }

    #[test]
    fn characteristics_omitted_without_params() {
        let html = build_description("Бумага A4", "500 листов", &[], &template());
        assert!(!html.contains("Характеристики"));
        assert!(!html.contains("<ul>"));
    }

    #[test]
    fn name_text_and_params_are_escaped() {
        let html = build_description(
            "Кабель <USB> & питание",
            "Длина 1.5 м & 2 м",
            &[Param::new("Разъем <A>", "USB \"Type-C\"")],
            &template(),
        );
        assert!(html.contains("<h3>Кабель &lt;USB&gt; &amp; питание</h3>"));
        assert!(html.contains("<p>Длина 1.5 м &amp; 2 м</p>"));
        assert!(html.contains("<strong>Разъем &lt;A&gt;:</strong> USB &quot;Type-C&quot;"));
    }

    #[test]
    fn supplier_markup_is_flattened_not_passed_through() {
        let html = build_description(
            "Принтер",
            "<div style=\"color:red\">Быстрая<br/>печать</div><script>x()</script>",
            &[],
            &template(),
        );
        assert!(html.contains("<p>Быстрая<br>печать</p>"));
        assert!(!html.contains("script"));
        assert!(!html.contains("style="));
    }

    #[test]
    fn default_template_is_stable_across_offers() {
        let t = DescriptionTemplate::default();
        let a = build_description("A", "", &[], &t);
        let b = build_description("B", "", &[], &t);
        assert!(a.starts_with(&t.contact_block));
        assert!(b.starts_with(&t.contact_block));
        assert!(a.ends_with(&t.terms_block));
        assert!(b.ends_with(&t.terms_block));
    }
}
