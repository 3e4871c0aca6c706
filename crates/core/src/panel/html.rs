use std::fmt::Write;

use super::control::{format_number, Control, Widget};

/// Renders the controls as a table, one labelled row per control.
pub(crate) fn render_table(controls: &[Control]) -> String {
    let mut html = String::from("<table>\n");
    for control in controls {
        let key = escape(&control.key);
        let _ = write!(html, "<tr><th>{}</th><td>", escape(&control.label));
        match &control.widget {
            Widget::Range {
                min,
                max,
                step,
                initial,
                value,
                text,
            } => {
                let step = format_number(*step);
                let _ = write!(
                    html,
                    r#"<input type="range" name="{key}" min="{}" max="{}" step="{step}" value="{}" data-initial="{}">"#,
                    format_number(*min),
                    format_number(*max),
                    format_number(*value),
                    format_number(*initial),
                );
                let _ = write!(html, r#"<input type="number" value="{}" step="{step}">"#, escape(text));
            }
            Widget::Checkbox { checked, .. } => {
                let checked = if *checked { " checked" } else { "" };
                let _ = write!(html, r#"<input type="checkbox" name="{key}"{checked}>"#);
            }
            Widget::Select {
                options, selected, ..
            } => {
                let _ = write!(html, r#"<select name="{key}">"#);
                for option in options {
                    let marker = if option == selected { " selected" } else { "" };
                    let _ = write!(html, "<option{marker}>{}</option>", escape(option));
                }
                html.push_str("</select>");
            }
        }
        html.push_str("</td></tr>\n");
    }
    html.push_str("</table>\n");
    html
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{CheckboxDescriptor, RangeDescriptor, SelectDescriptor};

    #[test]
    fn renders_one_row_per_control() {
        let controls = vec![
            Control::from_descriptor(
                RangeDescriptor::new("k", 0.0, 100.0, 1.0, 75.0)
                    .with_label("Gain <dB>")
                    .into(),
            )
            .unwrap(),
            Control::from_descriptor(CheckboxDescriptor::new("log", true).into()).unwrap(),
            Control::from_descriptor(SelectDescriptor::new("type", ["a", "b"]).with_initial("b").into()).unwrap(),
        ];

        let html = render_table(&controls);
        assert_eq!(html.matches("<tr>").count(), 3);
        assert!(html.contains("<th>Gain &lt;dB&gt;</th>"));
        assert!(html.contains(r#"<input type="range" name="k" min="0" max="100" step="1" value="75""#));
        assert!(html.contains(r#"<input type="number" value="75" step="1">"#));
        assert!(html.contains(r#"<input type="checkbox" name="log" checked>"#));
        assert!(html.contains("<option selected>b</option>"));
    }
}
