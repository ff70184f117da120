//! Outbound deep links
//!
//! Builds pre-filled WhatsApp links for the chat hand-off and for the site's
//! manual contact buttons.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left untouched by JavaScript's `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Reason a customer is contacting the farm over WhatsApp
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactTopic {
    /// Hero banner call to action
    Banner,
    /// Products and services section
    Services,
    /// Premium club sign-up
    Club,
    /// Interest in a specific breed
    Breed(String),
    /// Hand-off from the chat widget
    Handoff {
        /// Persona the customer talked to
        agent_name: String,
        /// Customer name (may be empty)
        customer_name: String,
        /// One-line purchase summary produced by the model
        summary: String,
    },
}

impl ContactTopic {
    /// Pre-filled message text for this topic
    pub fn message(&self) -> String {
        match self {
            ContactTopic::Banner => "Estoy interesado en sus mascotas premium.".to_string(),
            ContactTopic::Services => {
                "Necesito asesoría sobre sus productos y servicios.".to_string()
            }
            ContactTopic::Club => "Quiero unirme al Club Premium de GCMiRinconcito.".to_string(),
            ContactTopic::Breed(breed) => format!("Estoy interesado en la raza {}", breed),
            ContactTopic::Handoff {
                agent_name,
                customer_name,
                summary,
            } => format!(
                "¡Hola! Vengo del chat con {}. Mi nombre es {}. Resumen: {}",
                agent_name, customer_name, summary
            ),
        }
    }
}

/// Encode a string the way `encodeURIComponent` does
pub fn encode_uri_component(text: &str) -> String {
    utf8_percent_encode(text, URI_COMPONENT).to_string()
}

/// Build `https://wa.me/<phone>?text=<message>`
pub fn whatsapp_link(phone: &str, message: &str) -> String {
    format!(
        "https://wa.me/{}?text={}",
        phone,
        encode_uri_component(message)
    )
}

/// Build the WhatsApp link for a contact topic
pub fn contact_link(phone: &str, topic: &ContactTopic) -> String {
    whatsapp_link(phone, &topic.message())
}
