//! HTML fragments for individual survey questions (Material Design Lite markup)

const RADIO_CLASSES: &str = "mdl-radio mdl-js-radio mdl-js-ripple-effect";
const CHECKBOX_CLASSES: &str = "mdl-checkbox mdl-js-checkbox mdl-js-ripple-effect";
const TEXTFIELD_CLASSES: &str = "mdl-textfield mdl-js-textfield";

/// Numeric input pattern, also checked by the validation script
pub const NUMERIC_PATTERN: &str = r"-?[0-9]*(\.[0-9]+)?";

const SPACER: &str = "<br><br><br>";

pub fn instruction(text: &str) -> String {
    format!("<h3>{}</h3>{}", text, SPACER)
}

/// Radio group; the first option is pre-selected unless the question is required
pub fn radio(text: &str, id: &str, options: &[&str], values: &[&str], required: bool) -> String {
    let mut html = format!("<p>{}</p>", text);
    for (n, (option, value)) in options.iter().zip(values).enumerate() {
        let option_id = format!("{}_{}", id, n);
        let checked = if n == 0 && !required { "checked" } else { "" };
        html.push_str(&format!(
            "\n<label class=\"{classes}\" for=\"option-{oid}\">\n\
             <input type=\"radio\" id=\"option-{oid}\" class=\"mdl-radio__button\" name=\"{id}_options\" value=\"{value}\" {checked}>\n\
             <span class=\"mdl-radio__label\">{option}</span>\n</label>",
            classes = RADIO_CLASSES,
            oid = option_id,
            id = id,
            value = value,
            checked = checked,
            option = option,
        ));
    }
    html.push_str(SPACER);
    html
}

pub fn checkbox(text: &str, id: &str, options: &[&str]) -> String {
    let mut html = format!("<p>{}</p>", text);
    for (n, option) in options.iter().enumerate() {
        let option_id = format!("{}_{}", id, n);
        html.push_str(&format!(
            "\n<label class=\"{classes}\" for=\"checkbox-{oid}\">\n\
             <input type=\"checkbox\" id=\"checkbox-{oid}\" class=\"mdl-checkbox__input\" name=\"{id}_options\" value=\"{option}\">\n\
             <span class=\"mdl-checkbox__label\">{option}</span>\n</label>",
            classes = CHECKBOX_CLASSES,
            oid = option_id,
            id = id,
            option = option,
        ));
    }
    html.push_str(SPACER);
    html
}

fn prompt(text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        format!("<p>{}</p>", text)
    }
}

pub fn textfield(text: &str, id: &str) -> String {
    format!(
        "{}\n<div class=\"{}\">\n<input class=\"mdl-textfield__input\" type=\"text\" id=\"{id}\">\n\
         <label class=\"mdl-textfield__label\" for=\"{id}\"></label>\n</div>{}",
        prompt(text),
        TEXTFIELD_CLASSES,
        SPACER,
        id = id,
    )
}

pub fn numeric(text: &str, id: &str) -> String {
    format!(
        "{}\n<div class=\"{}\">\n<input class=\"mdl-textfield__input\" type=\"text\" pattern=\"{}\" id=\"{id}\">\n\
         <label class=\"mdl-textfield__label\" for=\"{id}\"></label>\n\
         <span class=\"mdl-textfield__error\">Input is not a number!</span>\n</div>{}",
        prompt(text),
        TEXTFIELD_CLASSES,
        NUMERIC_PATTERN,
        SPACER,
        id = id,
    )
}

pub fn textarea(text: &str, id: &str, rows: usize) -> String {
    format!(
        "{}\n<div class=\"{}\"><textarea class=\"mdl-textfield__input\" type=\"text\" rows= \"{}\" id=\"{id}\" ></textarea>\n\
         <label class=\"mdl-textfield__label\" for=\"{id}\"></label></div>{}",
        prompt(text),
        TEXTFIELD_CLASSES,
        rows,
        SPACER,
        id = id,
    )
}

/// Mark a question so the validation script counts it
pub fn required_wrapper(id: &str, fragment: &str) -> String {
    format!(
        "<div class=\"required-question\" data-question=\"{}\">\n{}\n</div>",
        id, fragment
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radio_ids_and_default_check() {
        let html = radio("Pick", "bis_1", &["Yes", "No"], &["1", "0"], false);
        assert!(html.starts_with("<p>Pick</p>"));
        assert!(html.contains("id=\"option-bis_1_0\""));
        assert!(html.contains("name=\"bis_1_options\" value=\"1\" checked>"));
        assert!(html.contains("name=\"bis_1_options\" value=\"0\" >"));
        assert!(html.ends_with("<br><br><br>"));
    }

    #[test]
    fn test_required_radio_has_no_default() {
        let html = radio("Pick", "q", &["Yes"], &["1"], true);
        assert!(!html.contains("checked"));
    }

    #[test]
    fn test_checkbox_options() {
        let html = checkbox("Which?", "s_2", &["a", "b", "c"]);
        assert_eq!(html.matches("type=\"checkbox\"").count(), 3);
        assert!(html.contains("id=\"checkbox-s_2_2\""));
    }

    #[test]
    fn test_numeric_pattern() {
        let html = numeric("Age", "s_0");
        assert!(html.contains(r#"pattern="-?[0-9]*(\.[0-9]+)?""#));
        assert!(html.contains("Input is not a number!"));
    }

    #[test]
    fn test_textfield_without_prompt() {
        let html = textfield("", "s_3");
        assert!(html.starts_with("\n<div class=\"mdl-textfield mdl-js-textfield\">"));
    }
}
