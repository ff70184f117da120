//! Session controller
//!
//! Owns the chat session state machine:
//!
//! ```text
//! Closed -> AwaitingName -> Active -> Ended -> (reconnect) -> AwaitingName
//! ```
//!
//! The controller is an actor: every input (clicks, keystrokes, timer fires)
//! arrives as a [`ChatEvent`] and is handled to completion before the next
//! one, including the remote call of a turn. A message submitted while a
//! call is outstanding therefore waits in the queue.

use crate::chat::config::ChatConfig;
use crate::chat::models::{Phase, Sender, Session, TranscriptEntry, Turn};
use crate::chat::prompts;
use crate::chat::rating::RatingPrompt;
use crate::chat::remote::{ClientError, RemoteClient};
use crate::chat::router::{route, Directive, NameVerdict, RouteContext, RouteStep};
use crate::chat::scheduler::{
    IdleStage, IdleTimeout, InactivityScheduler, NudgePicker, ScheduledTask, Scheduler,
};
use crate::chat::view::{ChatView, ViewUpdate};
use crate::services::markdown::{escape_html, parse_markdown};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Input to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Chat bubble clicked
    Toggle,
    /// Minimize control clicked
    Minimize,
    /// Close control clicked
    Close,
    /// Customer typed in the input field
    Keystroke,
    /// Customer sent a message
    Submit(String),
    /// Customer clicked a rating level
    SelectRating(u8),
    /// Customer submitted the rating
    SubmitRating,
    /// Customer asked for another agent
    Reconnect,
    /// Stop the controller loop
    Shutdown,
    /// Timer fired
    Deferred(Deferred),
}

/// Events posted by the controller's own timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// Open the widget unprompted
    ProactiveOpen,
    /// Inactivity window stage elapsed
    Idle(IdleTimeout),
    /// Rating prompt after a purchase hand-off, for the given session
    RatingDue(Uuid),
    /// Simulated agent assignment finished
    AgentAssigned,
}

/// Cloneable sender for feeding events to a running controller
#[derive(Debug, Clone)]
pub struct ChatHandle {
    tx: mpsc::UnboundedSender<ChatEvent>,
}

impl ChatHandle {
    /// Queue an event; returns false once the controller has stopped
    pub fn send(&self, event: ChatEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Pick a persona at random, avoiding `previous` when another name exists
pub fn pick_agent<R: Rng + ?Sized>(
    names: &[String],
    previous: Option<&str>,
    rng: &mut R,
) -> Option<String> {
    let available: Vec<&String> = names
        .iter()
        .filter(|name| Some(name.as_str()) != previous)
        .collect();
    if available.is_empty() {
        return names.choose(rng).cloned();
    }
    available.choose(rng).map(|name| (*name).clone())
}

/// Chat session state machine
pub struct SessionController {
    config: ChatConfig,
    remote: RemoteClient,
    view: Arc<dyn ChatView>,
    rng: StdRng,
    tx: mpsc::UnboundedSender<ChatEvent>,
    scheduler: Scheduler<ChatEvent>,
    inactivity: InactivityScheduler<ChatEvent>,
    nudges: NudgePicker,
    phase: Phase,
    session: Option<Session>,
    rating: Option<RatingPrompt>,
    reconnect_offered: bool,
    visible: bool,
    minimized: bool,
    proactive_task: Option<ScheduledTask>,
    rating_task: Option<ScheduledTask>,
    reconnect_task: Option<ScheduledTask>,
}

impl SessionController {
    /// Create a controller and the queue its timers post into
    pub fn new(
        config: ChatConfig,
        remote: RemoteClient,
        view: Arc<dyn ChatView>,
        rng: StdRng,
    ) -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx.clone());
        let inactivity = InactivityScheduler::new(
            scheduler.clone(),
            |timeout| ChatEvent::Deferred(Deferred::Idle(timeout)),
            config.inactivity_timeout,
            config.close_timeout,
        );

        let controller = Self {
            config,
            remote,
            view,
            rng,
            tx,
            scheduler,
            inactivity,
            nudges: NudgePicker::new(),
            phase: Phase::Closed,
            session: None,
            rating: None,
            reconnect_offered: false,
            visible: false,
            minimized: false,
            proactive_task: None,
            rating_task: None,
            reconnect_task: None,
        };
        (controller, rx)
    }

    /// Spawn a controller on the current runtime and return its handle
    pub fn spawn(config: ChatConfig, remote: RemoteClient, view: Arc<dyn ChatView>) -> ChatHandle {
        let (controller, rx) = Self::new(config, remote, view, StdRng::from_entropy());
        let handle = controller.chat_handle();
        tokio::spawn(controller.run(rx));
        handle
    }

    /// Handle for posting events into this controller's queue
    pub fn chat_handle(&self) -> ChatHandle {
        ChatHandle {
            tx: self.tx.clone(),
        }
    }

    /// Arm the proactive-open timer and process events until shutdown
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ChatEvent>) {
        self.start();
        while let Some(event) = rx.recv().await {
            if event == ChatEvent::Shutdown {
                break;
            }
            self.handle(event).await;
        }
        self.inactivity.cancel();
        info!("Chat controller stopped");
    }

    /// Arm the proactive-open timer
    pub fn start(&mut self) {
        self.proactive_task = Some(self.scheduler.schedule(
            self.config.proactive_timeout,
            ChatEvent::Deferred(Deferred::ProactiveOpen),
        ));
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current session, if one was started
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Whether the widget is shown
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the rating prompt is showing
    pub fn rating(&self) -> Option<&RatingPrompt> {
        self.rating.as_ref()
    }

    /// Whether the reconnect action is offered
    pub fn reconnect_offered(&self) -> bool {
        self.reconnect_offered
    }

    /// Process one event to completion
    pub async fn handle(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::Toggle => self.toggle(),
            ChatEvent::Minimize => self.minimize(),
            ChatEvent::Close => self.close(),
            ChatEvent::Keystroke => self.on_keystroke(),
            ChatEvent::Submit(text) => self.submit(&text).await,
            ChatEvent::SelectRating(level) => self.select_rating(level),
            ChatEvent::SubmitRating => self.submit_rating(),
            ChatEvent::Reconnect => self.request_reconnect(),
            ChatEvent::Shutdown => self.inactivity.cancel(),
            ChatEvent::Deferred(deferred) => self.on_deferred(deferred),
        }
    }

    fn toggle(&mut self) {
        self.visible = !self.visible;
        self.view.apply(ViewUpdate::WidgetVisible(self.visible));
        self.proactive_task = None;

        if self.visible && self.phase == Phase::Closed {
            self.initiate();
        }
    }

    fn minimize(&mut self) {
        self.minimized = !self.minimized;
        self.visible = !self.minimized;
        self.view.apply(ViewUpdate::WidgetVisible(self.visible));
    }

    fn close(&mut self) {
        self.visible = false;
        self.minimized = false;
        self.view.apply(ViewUpdate::WidgetVisible(false));
    }

    fn on_keystroke(&mut self) {
        if self.phase.accepts_messages() {
            self.inactivity.arm();
        }
    }

    /// Start a fresh session with an agent other than the previous one
    fn initiate(&mut self) {
        let previous = self.session.as_ref().map(|s| s.agent_name.clone());
        let agent = pick_agent(&self.config.agent_names, previous.as_deref(), &mut self.rng)
            .unwrap_or_else(|| "Agente".to_string());

        self.rating = None;
        self.rating_task = None;
        self.reconnect_offered = false;
        self.view.apply(ViewUpdate::Connecting {
            visible: false,
            text: prompts::CONNECTING_TEXT.to_string(),
        });
        self.view.apply(ViewUpdate::ClearMessages);

        let welcome = prompts::welcome_message(&agent);
        let mut session = Session::new(agent.clone());
        session.push_turn(Turn::model(welcome.clone()));
        info!(session_id = %session.id, agent = %agent, "Chat session started");
        self.session = Some(session);
        self.phase = Phase::AwaitingName;

        self.view
            .apply(ViewUpdate::AgentLabel(prompts::agent_label(&agent)));
        self.say(&welcome, true);
        self.inactivity.arm();
    }

    async fn submit(&mut self, text: &str) {
        if !self.phase.accepts_messages() {
            debug!(phase = ?self.phase, "Message ignored");
            return;
        }
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        self.inactivity.cancel();
        self.post(Sender::User, escape_html(text), false);

        match self.phase {
            Phase::AwaitingName => self.validate_name(text).await,
            Phase::Active => self.converse(text).await,
            Phase::Closed | Phase::Ended => {}
        }

        if self.phase.accepts_messages() {
            self.inactivity.arm();
        }
    }

    async fn validate_name(&mut self, answer: &str) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let agent = session.agent_name.clone();
        let history = session.history_with(Turn::user(answer));

        let outcome = match self
            .ask(&prompts::name_validation_prompt(answer), &history)
            .await
        {
            Ok(verdict) => match NameVerdict::parse(&verdict) {
                NameVerdict::Valid => Ok(None),
                NameVerdict::Invalid => self
                    .ask(&prompts::scold_prompt(&agent, answer), &[])
                    .await
                    .map(Some),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(None) => self.accept_name(answer),
            Ok(Some(scolding)) => {
                info!("Name rejected, asking again");
                self.say(&scolding, true);
                if let Some(session) = self.session.as_mut() {
                    session.push_turn(Turn::model(scolding));
                }
            }
            Err(e) => {
                warn!(error = %e, "Name validation failed, continuing without a name");
                self.say(prompts::VALIDATION_FALLBACK, true);
                self.phase = Phase::Active;
            }
        }
    }

    fn accept_name(&mut self, name: &str) {
        let greeting = prompts::greeting(name);
        if let Some(session) = self.session.as_mut() {
            session.customer_name = Some(name.to_string());
            session.push_turn(Turn::user(prompts::name_turn(name)));
            session.push_turn(Turn::model(greeting.clone()));
            info!(session_id = %session.id, "Customer name accepted");
        }
        self.phase = Phase::Active;
        self.say(&greeting, true);
    }

    async fn converse(&mut self, text: &str) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let context = prompts::system_prompt(&session.agent_name, session.addressee());
        let history = session.history_with(Turn::user(text));

        match self.ask(&context, &history).await {
            Ok(reply) => {
                if let Some(session) = self.session.as_mut() {
                    session.push_turn(Turn::user(text));
                    session.push_turn(Turn::model(reply.clone()));
                }
                self.dispatch(Directive::decode(&reply));
            }
            Err(e) => {
                warn!(error = %e, "Chat turn failed");
                self.say(prompts::CONNECTION_FALLBACK, true);
            }
        }
    }

    /// One remote call wrapped in the loading indicator
    async fn ask(&self, context: &str, history: &[Turn]) -> Result<String, ClientError> {
        self.view.apply(ViewUpdate::Loading(true));
        let result = self.remote.complete(context, history).await;
        self.view.apply(ViewUpdate::Loading(false));
        result
    }

    fn dispatch(&mut self, directive: Directive) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let session_id = session.id;
        let agent = session.agent_name.clone();
        let customer = session.addressee().to_string();
        debug!(directive = ?directive, "Routing reply");

        let steps = route(
            directive,
            RouteContext {
                agent_name: &agent,
                customer_name: &customer,
            },
            &self.config,
            &mut self.rng,
        );

        for step in steps {
            match step {
                RouteStep::Message { text, chime } => self.say(&text, chime),
                RouteStep::HandoffLink(url) => {
                    info!(session_id = %session_id, "Purchase hand-off offered");
                    self.view.apply(ViewUpdate::HandoffLink {
                        label: prompts::HANDOFF_LABEL.to_string(),
                        url,
                    });
                }
                RouteStep::ComplaintLink(url) => {
                    info!(session_id = %session_id, "Complaint escalated");
                    self.view.apply(ViewUpdate::ComplaintLink {
                        label: prompts::COMPLAINT_LABEL.to_string(),
                        url,
                    });
                }
                RouteStep::OfferRating => self.offer_rating(),
                RouteStep::OfferRatingAfter(delay) => {
                    self.rating_task = Some(self.scheduler.schedule(
                        delay,
                        ChatEvent::Deferred(Deferred::RatingDue(session_id)),
                    ));
                }
                RouteStep::EndSession => self.end_session(),
                RouteStep::OfferReconnect => self.offer_reconnect(),
            }
        }
    }

    fn end_session(&mut self) {
        self.phase = Phase::Ended;
        self.inactivity.cancel();
        if let Some(session) = self.session.as_ref() {
            info!(session_id = %session.id, "Chat session ended");
        }
    }

    fn offer_rating(&mut self) {
        self.end_session();
        let prompt = RatingPrompt::new(self.config.rating_levels);
        self.view.apply(ViewUpdate::RatingPrompt {
            question: prompts::RATING_QUESTION.to_string(),
            levels: prompt.levels(),
        });
        self.rating = Some(prompt);
    }

    fn select_rating(&mut self, level: u8) {
        if let Some(prompt) = self.rating.as_mut() {
            let chosen = prompt.select(level);
            self.view.apply(ViewUpdate::RatingSelection(chosen));
        }
    }

    fn submit_rating(&mut self) {
        let Some(stars) = self.rating.as_ref().and_then(RatingPrompt::submit) else {
            return;
        };
        info!(stars, "Rating submitted");
        self.rating = None;
        self.view.apply(ViewUpdate::RatingClosed);
        self.view
            .apply(ViewUpdate::Feedback(prompts::rating_thanks(stars)));
        self.offer_reconnect();
    }

    fn offer_reconnect(&mut self) {
        if self.reconnect_offered {
            return;
        }
        self.reconnect_offered = true;
        self.view.apply(ViewUpdate::ReconnectOffer {
            visible: true,
            label: prompts::RECONNECT_LABEL.to_string(),
        });
    }

    fn request_reconnect(&mut self) {
        if self.phase != Phase::Ended || !self.reconnect_offered {
            debug!(phase = ?self.phase, "Reconnect ignored");
            return;
        }
        self.reconnect_offered = false;
        self.view.apply(ViewUpdate::ReconnectOffer {
            visible: false,
            label: prompts::RECONNECT_LABEL.to_string(),
        });
        self.view.apply(ViewUpdate::Connecting {
            visible: true,
            text: prompts::CONNECTING_TEXT.to_string(),
        });

        let delay = self.reconnect_delay();
        info!(delay_ms = delay.as_millis() as u64, "Looking for another agent");
        self.reconnect_task = Some(
            self.scheduler
                .schedule(delay, ChatEvent::Deferred(Deferred::AgentAssigned)),
        );
    }

    fn reconnect_delay(&mut self) -> Duration {
        let min = self.config.reconnect_delay_min.as_millis() as u64;
        let max = self.config.reconnect_delay_max.as_millis() as u64;
        if max > min {
            Duration::from_millis(self.rng.gen_range(min..=max))
        } else {
            Duration::from_millis(min)
        }
    }

    fn on_deferred(&mut self, deferred: Deferred) {
        match deferred {
            Deferred::ProactiveOpen => {
                self.proactive_task = None;
                if !self.visible {
                    info!("Opening chat proactively");
                    self.toggle();
                }
            }
            Deferred::Idle(timeout) => self.on_idle(timeout),
            Deferred::RatingDue(session_id) => {
                self.rating_task = None;
                let current = self.session.as_ref().map(|s| s.id) == Some(session_id);
                if current && self.phase != Phase::Ended {
                    self.offer_rating();
                }
            }
            Deferred::AgentAssigned => {
                if self.reconnect_task.take().is_some() {
                    self.initiate();
                }
            }
        }
    }

    fn on_idle(&mut self, timeout: IdleTimeout) {
        if !self.inactivity.is_current(&timeout) {
            debug!(generation = timeout.generation, "Stale inactivity timer ignored");
            return;
        }

        match timeout.stage {
            IdleStage::Nudge => {
                let customer = self
                    .session
                    .as_ref()
                    .map(|s| s.addressee().to_string())
                    .unwrap_or_default();
                let nudges = prompts::nudge_messages(&customer);
                if let Some(index) = self.nudges.pick(nudges.len(), &mut self.rng) {
                    self.say(&nudges[index], true);
                }
                self.inactivity.arm_close();
            }
            IdleStage::AutoClose => {
                info!("Closing chat session for inactivity");
                self.say(prompts::INACTIVITY_CLOSE, true);
                self.end_session();
                self.offer_reconnect();
            }
        }
    }

    /// Render a bot message through Markdown
    fn say(&mut self, text: &str, chime: bool) {
        self.post(Sender::Bot, parse_markdown(text), chime);
    }

    fn post(&mut self, sender: Sender, content: String, chime: bool) {
        let entry = TranscriptEntry { sender, content };
        if let Some(session) = self.session.as_mut() {
            session.push_entry(entry.clone());
        }
        self.view.apply(ViewUpdate::Message(entry));
        if chime {
            self.view.apply(ViewUpdate::Chime {
                pulse_bubble: !self.visible,
            });
        }
    }
}
