//! Response router
//!
//! Decodes the model's raw reply into a [`Directive`] and turns it into an
//! ordered plan of UI steps. The sentinel strings agreed with the model in
//! the system prompt are matched here and nowhere else.

use crate::chat::config::ChatConfig;
use crate::chat::prompts;
use crate::services::links::{contact_link, ContactTopic};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Prefix announcing a purchase hand-off
pub const PURCHASE_INTENT_PREFIX: &str = "COMPRA_INTENT:";
/// Reply ending the conversation
pub const END_SESSION_SENTINEL: &str = "FINALIZAR_SESION";
/// Reply escalating to a manager
pub const COMPLAINT_SENTINEL: &str = "INICIAR_QUEJA";

/// Control meaning of a model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Customer wants to buy: hand the conversation off to WhatsApp
    PurchaseIntent {
        /// First line after the prefix
        summary: String,
        /// Remaining lines, shown to the customer
        handoff: String,
    },
    /// Customer is done
    EndSession,
    /// Customer is upset or asks for a manager
    Complaint,
    /// Regular reply
    Reply(String),
}

impl Directive {
    /// Classify a raw reply
    ///
    /// Surrounding whitespace is ignored. Sentinels are case-sensitive: a
    /// lowercase `finalizar_sesion` is shown as ordinary text.
    pub fn decode(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Some(rest) = trimmed.strip_prefix(PURCHASE_INTENT_PREFIX) {
            let (summary, handoff) = match rest.split_once('\n') {
                Some((first, remainder)) => (first, remainder),
                None => (rest, ""),
            };
            return Directive::PurchaseIntent {
                summary: summary.trim().to_string(),
                handoff: handoff.to_string(),
            };
        }

        match trimmed {
            END_SESSION_SENTINEL => Directive::EndSession,
            COMPLAINT_SENTINEL => Directive::Complaint,
            _ => Directive::Reply(normalize_quotes(raw)),
        }
    }
}

/// Replace typographic quotes with their ASCII counterparts
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Verdict of the name classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameVerdict {
    /// Plausible, respectful personal name
    Valid,
    /// Joke, double entendre or not a name
    Invalid,
}

impl NameVerdict {
    /// Anything other than `VALID` (case-insensitive, trimmed) is invalid
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("VALID") {
            NameVerdict::Valid
        } else {
            NameVerdict::Invalid
        }
    }
}

/// One UI step produced by the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteStep {
    /// Bot message; `chime` plays the notification
    Message {
        /// Raw text (rendered by the controller)
        text: String,
        /// Whether the notification plays
        chime: bool,
    },
    /// Link to finish the purchase on WhatsApp
    HandoffLink(String),
    /// Link to the complaint form
    ComplaintLink(String),
    /// Show the rating prompt now (ends the session)
    OfferRating,
    /// Show the rating prompt after a delay, unless the session ended
    OfferRatingAfter(Duration),
    /// Mark the session ended without a rating
    EndSession,
    /// Offer to connect with another agent
    OfferReconnect,
}

/// Names interpolated into routed messages
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    /// Persona of the session
    pub agent_name: &'a str,
    /// Customer name, empty when unknown
    pub customer_name: &'a str,
}

/// Plan the UI steps for a decoded reply
pub fn route<R: Rng + ?Sized>(
    directive: Directive,
    ctx: RouteContext<'_>,
    config: &ChatConfig,
    rng: &mut R,
) -> Vec<RouteStep> {
    match directive {
        Directive::PurchaseIntent { summary, handoff } => {
            let mut steps = Vec::with_capacity(3);
            if !handoff.trim().is_empty() {
                steps.push(RouteStep::Message {
                    text: handoff,
                    chime: true,
                });
            }
            let topic = ContactTopic::Handoff {
                agent_name: ctx.agent_name.to_string(),
                customer_name: ctx.customer_name.to_string(),
                summary,
            };
            steps.push(RouteStep::HandoffLink(contact_link(
                &config.whatsapp_phone,
                &topic,
            )));
            steps.push(RouteStep::OfferRatingAfter(config.rating_delay));
            steps
        }
        Directive::EndSession => vec![
            RouteStep::Message {
                text: prompts::farewell(ctx.customer_name),
                chime: true,
            },
            RouteStep::OfferRating,
        ],
        Directive::Complaint => {
            let options = prompts::complaint_messages(ctx.customer_name);
            let text = options
                .choose(rng)
                .cloned()
                .unwrap_or_else(|| options[0].clone());
            vec![
                RouteStep::Message { text, chime: false },
                RouteStep::ComplaintLink(config.complaint_form_url.clone()),
                RouteStep::Message {
                    text: prompts::COMPLAINT_FOLLOW_UP.to_string(),
                    chime: true,
                },
                RouteStep::EndSession,
                RouteStep::OfferReconnect,
            ]
        }
        Directive::Reply(text) => vec![RouteStep::Message { text, chime: true }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ctx() -> RouteContext<'static> {
        RouteContext {
            agent_name: "Ana",
            customer_name: "Pedro",
        }
    }

    #[test]
    fn test_decode_end_session_variants() {
        assert_eq!(Directive::decode("FINALIZAR_SESION"), Directive::EndSession);
        assert_eq!(Directive::decode("  FINALIZAR_SESION\n"), Directive::EndSession);
        assert_eq!(
            Directive::decode("finalizar_sesion"),
            Directive::Reply("finalizar_sesion".to_string())
        );
        assert_eq!(
            Directive::decode("FINALIZAR_SESION ahora"),
            Directive::Reply("FINALIZAR_SESION ahora".to_string())
        );
    }

    #[test]
    fn test_decode_complaint_variants() {
        assert_eq!(Directive::decode("INICIAR_QUEJA"), Directive::Complaint);
        assert_eq!(Directive::decode("\tINICIAR_QUEJA  "), Directive::Complaint);
        assert!(matches!(
            Directive::decode("Iniciar_Queja"),
            Directive::Reply(_)
        ));
    }

    #[test]
    fn test_decode_purchase_intent() {
        let directive =
            Directive::decode("COMPRA_INTENT: 2 conejos Mariposa\n¡Excelente elección!\nTe espero.");
        assert_eq!(
            directive,
            Directive::PurchaseIntent {
                summary: "2 conejos Mariposa".to_string(),
                handoff: "¡Excelente elección!\nTe espero.".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_purchase_intent_single_line() {
        assert_eq!(
            Directive::decode(" COMPRA_INTENT:heno"),
            Directive::PurchaseIntent {
                summary: "heno".to_string(),
                handoff: String::new(),
            }
        );
    }

    #[test]
    fn test_decode_purchase_intent_is_case_sensitive() {
        assert!(matches!(
            Directive::decode("compra_intent: heno"),
            Directive::Reply(_)
        ));
    }

    #[test]
    fn test_decode_reply_normalizes_quotes() {
        assert_eq!(
            Directive::decode("Es muy \u{201C}dócil\u{201D} y \u{2018}tranquilo\u{2019}"),
            Directive::Reply("Es muy \"dócil\" y 'tranquilo'".to_string())
        );
    }

    #[test]
    fn test_name_verdict() {
        assert_eq!(NameVerdict::parse("VALID"), NameVerdict::Valid);
        assert_eq!(NameVerdict::parse(" valid\n"), NameVerdict::Valid);
        assert_eq!(NameVerdict::parse("INVALID"), NameVerdict::Invalid);
        assert_eq!(NameVerdict::parse("VALID."), NameVerdict::Invalid);
        assert_eq!(NameVerdict::parse(""), NameVerdict::Invalid);
    }

    #[test]
    fn test_route_purchase_intent_builds_single_link() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = ChatConfig::default();
        let steps = route(
            Directive::decode("COMPRA_INTENT: heno premium\nTe paso con ventas"),
            ctx(),
            &config,
            &mut rng,
        );

        let links: Vec<&String> = steps
            .iter()
            .filter_map(|s| match s {
                RouteStep::HandoffLink(url) => Some(url),
                _ => None,
            })
            .collect();
        assert_eq!(links.len(), 1);
        assert!(links[0].starts_with("https://wa.me/529811579841?text="));
        assert!(links[0].contains("Ana"));
        assert!(links[0].contains("Pedro"));
        assert!(links[0].contains("heno%20premium"));
        assert_eq!(
            steps.last(),
            Some(&RouteStep::OfferRatingAfter(config.rating_delay))
        );
    }

    #[test]
    fn test_route_end_session() {
        let mut rng = StdRng::seed_from_u64(1);
        let steps = route(Directive::EndSession, ctx(), &ChatConfig::default(), &mut rng);
        assert_eq!(steps.len(), 2);
        assert!(matches!(&steps[0], RouteStep::Message { text, .. } if text.contains("Pedro")));
        assert_eq!(steps[1], RouteStep::OfferRating);
    }

    #[test]
    fn test_route_complaint_ends_session() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = ChatConfig::default();
        let steps = route(Directive::Complaint, ctx(), &config, &mut rng);

        assert!(matches!(&steps[0], RouteStep::Message { chime: false, .. }));
        assert!(steps.contains(&RouteStep::ComplaintLink(config.complaint_form_url.clone())));
        assert!(steps.contains(&RouteStep::EndSession));
        assert_eq!(steps.last(), Some(&RouteStep::OfferReconnect));
    }

    #[test]
    fn test_route_reply() {
        let mut rng = StdRng::seed_from_u64(3);
        let steps = route(
            Directive::Reply("Hola".to_string()),
            ctx(),
            &ChatConfig::default(),
            &mut rng,
        );
        assert_eq!(
            steps,
            vec![RouteStep::Message {
                text: "Hola".to_string(),
                chime: true
            }]
        );
    }
}
