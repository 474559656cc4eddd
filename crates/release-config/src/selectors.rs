use serde::{Deserialize, Serialize};

/// Ordered locator lists for every UI action of the login and release flows.
///
/// Entries starting with `//` are XPath, everything else is CSS. Earlier
/// entries win. Any list can be replaced from the `[selectors]` table of the
/// config file when the console markup changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsoleSelectors {
    pub email_input: Vec<String>,
    pub email_next: Vec<String>,
    pub password_input: Vec<String>,
    pub password_next: Vec<String>,
    pub edit_draft: Vec<String>,
    pub next: Vec<String>,
    pub save_and_release: Vec<String>,
    pub publish_dialog_header: Vec<String>,
    pub confirm_release: Vec<String>,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ConsoleSelectors {
    fn default() -> Self {
        Self {
            email_input: owned(&[
                "input[type='email']",
                "input#identifierId",
                "input[name='identifier']",
            ]),
            email_next: owned(&[
                "button#identifierNext",
                "button[jsname='LgbsSe'][type='button']",
                "//button[.//span[contains(text(), '다음')]]",
                "//button[.//span[text()='Next']]",
                "button[type='button']",
            ]),
            password_input: owned(&[
                "input[name='Passwd']",
                "input[type='password'][name='Passwd']",
                "input[type='password'][autocomplete='current-password']",
                "input[jsname='YPqjbf'][type='password']",
                "input.whsOnd.zHQkBf[type='password']",
                "input[type='password']",
                "input[name='password']",
                "input#password",
            ]),
            password_next: owned(&[
                "button#passwordNext",
                "button[jsname='LgbsSe'][type='button']",
                "//button[.//span[contains(text(), '다음')]]",
                "//button[.//span[text()='Next']]",
                "button[type='button']",
            ]),
            edit_draft: owned(&[
                "button[debug-id='edit-draft-release-button']",
                "//button[contains(text(), '버전 수정')]",
                "//button[contains(text(), 'Edit draft')]",
                "button.mdc-button.mdc-button--text",
            ]),
            next: owned(&[
                "button[type='submit']",
                "//button[contains(., '다음')]",
                "//button[contains(., 'Next')]",
                "//div[contains(@class, 'button-content') and contains(text(), '다음')]/..",
                "button.mdc-button[type='submit']",
            ]),
            save_and_release: owned(&[
                "button[debug-id='main-button']",
                "//button[contains(., '저장 및 출시')]",
                "//button[contains(., 'Save and release')]",
                "//span[@class='mdc-button__label' and contains(text(), '저장 및 출시')]/..",
                "button.mdc-button.mdc-button--unelevated.overflowable-button",
            ]),
            publish_dialog_header: owned(&[
                "//h1[contains(text(), 'Google Play에 변경사항을') or contains(text(), 'Publish changes')]",
            ]),
            confirm_release: owned(&[
                "button[debug-id='yes-button']",
                "button.yes-button",
                "//button[contains(@class, 'yes-button')]",
                "//span[contains(@class, 'yes-button-label') and contains(text(), '저장 및 출시')]/..",
                "//button[contains(., '저장 및 출시') and contains(@class, 'yes-button')]",
            ]),
        }
    }
}

impl ConsoleSelectors {
    /// Name of the first empty list, if any
    pub fn first_empty(&self) -> Option<&'static str> {
        let lists: [(&'static str, &Vec<String>); 9] = [
            ("email_input", &self.email_input),
            ("email_next", &self.email_next),
            ("password_input", &self.password_input),
            ("password_next", &self.password_next),
            ("edit_draft", &self.edit_draft),
            ("next", &self.next),
            ("save_and_release", &self.save_and_release),
            ("publish_dialog_header", &self.publish_dialog_header),
            ("confirm_release", &self.confirm_release),
        ];
        lists
            .into_iter()
            .find(|(_, list)| list.iter().all(|s| s.trim().is_empty()))
            .map(|(name, _)| name)
    }
}
