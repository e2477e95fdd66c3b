//! Client-side page validation for rendered surveys
//!
//! The script exposes `validate_step(index)` for the page wizard. A page may
//! be left only when every required question on it has an answer; passing the
//! last page sets `expfactory_finished` instead of advancing.

use super::SurveyPage;

const SCRIPT_BODY: &str = r#"
function question_answered(question) {
    var inputs = question.querySelectorAll("input, textarea");
    for (var i = 0; i < inputs.length; i++) {
        var input = inputs[i];
        if (input.type == "radio" || input.type == "checkbox") {
            if (input.checked) {
                return true;
            }
        } else if (input.value.trim() != "") {
            var pattern = input.getAttribute("pattern");
            if (!pattern || new RegExp("^(?:" + pattern + ")$").test(input.value)) {
                return true;
            }
        }
    }
    return false;
}

function validate_step(index) {
    var steps = document.querySelectorAll("fieldset.step");
    if (index < 0 || index >= steps.length) {
        // no pages, nothing to answer
        expfactory_finished = true;
        return true;
    }
    var questions = steps[index].querySelectorAll(".required-question");
    var answered = 0;
    for (var i = 0; i < questions.length; i++) {
        if (question_answered(questions[i])) {
            answered += 1;
        }
    }
    if (answered < required_count[index]) {
        alert("Please answer all required questions before continuing.");
        return false;
    }
    if (index == required_count.length - 1) {
        expfactory_finished = true;
    }
    return true;
}
"#;

/// Validation script for `pages`, in page order
pub fn validation_script(pages: &[SurveyPage]) -> String {
    let counts: Vec<String> = pages.iter().map(|page| page.required.to_string()).collect();
    format!(
        "var expfactory_finished = false;\nvar required_count = [{}];\n{}",
        counts.join(", "),
        SCRIPT_BODY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_counts_per_page() {
        let pages = vec![
            SurveyPage {
                page: "1".into(),
                questions: vec![],
                required: 2,
            },
            SurveyPage {
                page: "2".into(),
                questions: vec![],
                required: 0,
            },
        ];
        let js = validation_script(&pages);
        assert!(js.starts_with("var expfactory_finished = false;\nvar required_count = [2, 0];\n"));
        assert!(js.contains("expfactory_finished = true;"));
    }

    #[test]
    fn test_empty_survey_guards_step_index() {
        let js = validation_script(&[]);
        assert!(js.contains("var required_count = [];"));
        assert!(js.contains("if (index < 0 || index >= steps.length) {"));
        let guard = js.find("index >= steps.length").unwrap();
        let lookup = js.find("steps[index]").unwrap();
        assert!(guard < lookup);
    }
}
