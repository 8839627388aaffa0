//! Form-state tokens and the partial-postback form of the registry search page.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Hidden input carrying the serialized page state.
pub const VIEWSTATE: &str = "__VIEWSTATE";

/// Hidden input identifying the page class that produced the state.
pub const VIEWSTATE_GENERATOR: &str = "__VIEWSTATEGENERATOR";

/// Hidden input listing the postbacks the server will accept.
pub const EVENT_VALIDATION: &str = "__EVENTVALIDATION";

/// Control whose click triggers the search by tax ID.
const SEARCH_BUTTON: &str = "ctl00$cphMain$btnBuscarPorRNC";

/// Update panel refreshed by the search.
const UPDATE_PANEL: &str = "ctl00$cphMain$upBusqueda";

/// Text box holding the queried tax ID.
const TAX_ID_FIELD: &str = "ctl00$cphMain$txtRNCCedula";

fn input_selector(name: &str) -> Selector {
    Selector::parse(&format!("input[name=\"{name}\"]")).expect("valid input selector")
}

static VIEWSTATE_INPUT: LazyLock<Selector> = LazyLock::new(|| input_selector(VIEWSTATE));
static GENERATOR_INPUT: LazyLock<Selector> = LazyLock::new(|| input_selector(VIEWSTATE_GENERATOR));
static VALIDATION_INPUT: LazyLock<Selector> = LazyLock::new(|| input_selector(EVENT_VALIDATION));

/// Anti-automation tokens captured from the search page.
///
/// The tokens are bound to the session that fetched them and must be replayed
/// verbatim in the postback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormTokens {
    /// Value of `__VIEWSTATE`.
    pub view_state: String,
    /// Value of `__VIEWSTATEGENERATOR`.
    pub view_state_generator: String,
    /// Value of `__EVENTVALIDATION`.
    pub event_validation: String,
}

impl FormTokens {
    /// Reads the three hidden inputs from the search page.
    ///
    /// Fails with a `RegistryProtocol` error when any of them is missing or
    /// when the view state is empty, which happens when the page layout
    /// changed or the request was served a block page.
    pub fn from_search_page(html: &str) -> Result<Self> {
        let document = Html::parse_document(html);

        let read = |selector: &Selector, name: &str| -> Result<String> {
            document
                .select(selector)
                .next()
                .and_then(|input| input.value().attr("value"))
                .map(str::to_owned)
                .ok_or_else(|| {
                    Error::registry_protocol()
                        .with_message(format!("search page is missing the {name} token"))
                })
        };

        let view_state = read(&VIEWSTATE_INPUT, VIEWSTATE)?;
        if view_state.is_empty() {
            return Err(Error::registry_protocol()
                .with_message(format!("search page carries an empty {VIEWSTATE} token")));
        }

        Ok(Self {
            view_state,
            view_state_generator: read(&GENERATOR_INPUT, VIEWSTATE_GENERATOR)?,
            event_validation: read(&VALIDATION_INPUT, EVENT_VALIDATION)?,
        })
    }
}

/// Body of the asynchronous postback that searches one tax ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostbackForm {
    fields: Vec<(&'static str, String)>,
}

impl PostbackForm {
    /// Builds the search postback for `tax_id` from previously captured tokens.
    pub fn search(tokens: &FormTokens, tax_id: &str) -> Self {
        let fields = vec![
            ("ctl00$smMain", format!("{UPDATE_PANEL}|{SEARCH_BUTTON}")),
            (TAX_ID_FIELD, tax_id.to_owned()),
            ("ctl00$cphMain$txtRazonSocial", String::new()),
            ("ctl00$cphMain$hidActiveTab", String::new()),
            ("__EVENTTARGET", SEARCH_BUTTON.to_owned()),
            ("__EVENTARGUMENT", String::new()),
            ("__LASTFOCUS", String::new()),
            (VIEWSTATE, tokens.view_state.clone()),
            (VIEWSTATE_GENERATOR, tokens.view_state_generator.clone()),
            (EVENT_VALIDATION, tokens.event_validation.clone()),
            ("__ASYNCPOST", "true".to_owned()),
        ];

        Self { fields }
    }

    /// Returns the value submitted for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the tax ID this form searches for.
    pub fn tax_id(&self) -> Option<&str> {
        self.get(TAX_ID_FIELD)
    }

    /// Returns the form fields in submission order.
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }
}
