//! Reply flows. One inbound event runs through exactly one flow: menu
//! commands record what the user is about to do, date messages produce a
//! reading, inline buttons pin down a period or kind. Generation failures
//! never reach the user; the flow swaps in deterministic local text and
//! keeps going.

use std::sync::Arc;

use chrono::Utc;
use numera_core::errors::FlowError;
use numera_core::history::{ActionRecord, ActionTag, ForecastPeriod, HoroscopeKind};
use numera_core::intent::{classify, BirthDate, MenuCommand, PendingIntent};
use numera_core::numerology::{
    fallback_affirmation, fallback_reply, life_path_number, number_of_the_day, welcome_opening,
};
use numera_oracle::{prompts, OracleError, PromptStyle, TextGenerator};
use numera_store::{FlowCategory, StateStore, UserIdentity, UserSeen};
use tracing::{info, warn};

use crate::api::BotApi;
use crate::keyboards::{
    forecast_periods, horoscope_kinds, main_menu, parse_callback, CallbackAction,
};
use crate::update::InboundEvent;

const SEND_ONE_DATE: &str =
    "Send a birth date in the DD.MM.YYYY format, for example: 15.05.1990";
const SEND_TWO_DATES: &str =
    "Send two birth dates separated by a space, for example: 15.05.1990 20.08.1985";
const FORMAT_HELP: &str = "I did not catch that. Pick an option from the menu, or send a birth \
                           date as DD.MM.YYYY (two dates separated by a space for a \
                           compatibility check).";
const ABOUT_TEXT: &str = "I am a numerology assistant. I build personal portraits, compatibility \
                          analyses, forecasts, horoscopes and daily affirmations from birth \
                          dates. Everything starts from the menu below.";
const STATS_DENIED: &str = "Statistics are only available to administrators.";

pub struct EventProcessor {
    store: Arc<StateStore>,
    generator: Arc<dyn TextGenerator>,
    api: Arc<dyn BotApi>,
    admin_ids: Vec<i64>,
}

impl EventProcessor {
    pub fn new(
        store: Arc<StateStore>,
        generator: Arc<dyn TextGenerator>,
        api: Arc<dyn BotApi>,
        admin_ids: Vec<i64>,
    ) -> Self {
        Self { store, generator, api, admin_ids }
    }

    /// Run one inbound event to completion. The only error that escapes is a
    /// delivery failure; everything upstream of delivery degrades to local
    /// fallback text.
    pub async fn process(&self, event: InboundEvent) -> Result<(), FlowError> {
        match event {
            InboundEvent::TextMessage { chat_id, sender, text } => {
                self.note_contact(&sender).await;
                let history = self.store.history(sender.id).await;
                let intent = classify(&text, &history);
                info!(user_id = sender.id, intent = ?intent, "classified inbound message");
                self.run_intent(chat_id, &sender, intent).await
            }
            InboundEvent::Callback { chat_id, sender, callback_id, data } => {
                self.note_contact(&sender).await;
                if let Err(error) = self.api.answer_callback(&callback_id).await {
                    warn!(user_id = sender.id, error = %error, "callback ack failed");
                }
                self.run_callback(chat_id, &sender, &data).await
            }
            InboundEvent::Unsupported { update_id } => {
                info!(update_id, "dropping unsupported update");
                Ok(())
            }
        }
    }

    async fn note_contact(&self, sender: &UserIdentity) {
        if self.store.record_user_seen(sender).await == UserSeen::New {
            self.store.increment_counter(FlowCategory::NewUser, Utc::now().date_naive()).await;
        }
    }

    async fn run_intent(
        &self,
        chat_id: i64,
        sender: &UserIdentity,
        intent: PendingIntent,
    ) -> Result<(), FlowError> {
        match intent {
            PendingIntent::Menu(command) => self.run_menu(chat_id, sender, command).await,
            PendingIntent::Portrait(date) => self.run_portrait(chat_id, sender, date).await,
            PendingIntent::Compatibility(first, second) => {
                self.run_compatibility(chat_id, sender, first, second).await
            }
            PendingIntent::Forecast(date, period) => {
                self.run_forecast(chat_id, sender, date, period).await
            }
            PendingIntent::Horoscope(date, kind) => {
                self.run_horoscope(chat_id, sender, date, kind).await
            }
            PendingIntent::Affirmation(date) => self.run_affirmation(chat_id, sender, date).await,
            PendingIntent::Unknown => self.send(chat_id, FORMAT_HELP, None).await,
        }
    }

    async fn run_menu(
        &self,
        chat_id: i64,
        sender: &UserIdentity,
        command: MenuCommand,
    ) -> Result<(), FlowError> {
        match command {
            MenuCommand::Start => {
                self.store.append_action(sender.id, ActionRecord::new(ActionTag::Started)).await;
                let welcome = format!(
                    "{}, {}! I read birth dates the numerological way. Pick what you would \
                     like to explore:",
                    welcome_opening(),
                    sender.display_name()
                );
                self.send(chat_id, &welcome, Some(main_menu())).await
            }
            MenuCommand::Portrait => {
                self.store
                    .append_action(sender.id, ActionRecord::new(ActionTag::PortraitRequested))
                    .await;
                self.send(chat_id, SEND_ONE_DATE, None).await
            }
            MenuCommand::Compatibility => {
                self.store
                    .append_action(sender.id, ActionRecord::new(ActionTag::CompatibilityRequested))
                    .await;
                self.send(chat_id, SEND_TWO_DATES, None).await
            }
            MenuCommand::Forecast => {
                self.send(chat_id, "Which period should the forecast cover?", Some(forecast_periods()))
                    .await
            }
            MenuCommand::Horoscope => {
                self.send(chat_id, "Which horoscope would you like?", Some(horoscope_kinds())).await
            }
            MenuCommand::Affirmation => {
                self.store
                    .append_action(sender.id, ActionRecord::new(ActionTag::AffirmationRequested))
                    .await;
                self.send(chat_id, SEND_ONE_DATE, None).await
            }
            MenuCommand::About => {
                let readings = self.store.counters().await.lifetime.total_readings();
                let about = format!("{ABOUT_TEXT}\n\nReadings delivered so far: {readings}");
                self.send(chat_id, &about, None).await
            }
            MenuCommand::Stats => self.run_stats(chat_id, sender).await,
        }
    }

    async fn run_callback(
        &self,
        chat_id: i64,
        sender: &UserIdentity,
        data: &str,
    ) -> Result<(), FlowError> {
        match parse_callback(data) {
            Some(CallbackAction::Forecast(period)) => {
                self.store
                    .append_action(
                        sender.id,
                        ActionRecord::new(ActionTag::ForecastRequested { period }),
                    )
                    .await;
                self.send(chat_id, SEND_ONE_DATE, None).await
            }
            Some(CallbackAction::Horoscope(kind)) => {
                self.store
                    .append_action(
                        sender.id,
                        ActionRecord::new(ActionTag::HoroscopeRequested { kind }),
                    )
                    .await;
                self.send(chat_id, SEND_ONE_DATE, None).await
            }
            None => {
                // Stale or foreign button; the ack above already dismissed it.
                warn!(user_id = sender.id, data, "ignoring unparsable callback data");
                Ok(())
            }
        }
    }

    async fn run_portrait(
        &self,
        chat_id: i64,
        sender: &UserIdentity,
        date: BirthDate,
    ) -> Result<(), FlowError> {
        let life = life_path_number(&date);
        let prompt = prompts::portrait(&date, life, Utc::now().date_naive());
        let text = self.generate(&prompt, PromptStyle::Detailed, fallback_reply()).await;
        self.send(chat_id, &text, None).await?;
        self.finish_reading(sender, ActionTag::PortraitGenerated, FlowCategory::Portrait).await;
        Ok(())
    }

    async fn run_compatibility(
        &self,
        chat_id: i64,
        sender: &UserIdentity,
        first: BirthDate,
        second: BirthDate,
    ) -> Result<(), FlowError> {
        let prompt = prompts::compatibility(
            &first,
            &second,
            life_path_number(&first),
            life_path_number(&second),
        );
        let text = self.generate(&prompt, PromptStyle::Compatibility, fallback_reply()).await;
        self.send(chat_id, &text, None).await?;
        self.finish_reading(sender, ActionTag::CompatibilityGenerated, FlowCategory::Compatibility)
            .await;
        Ok(())
    }

    async fn run_forecast(
        &self,
        chat_id: i64,
        sender: &UserIdentity,
        date: BirthDate,
        period: ForecastPeriod,
    ) -> Result<(), FlowError> {
        let life = life_path_number(&date);
        let prompt = prompts::forecast(&date, life, period, Utc::now().date_naive());
        let text = self.generate(&prompt, PromptStyle::Forecast, fallback_reply()).await;
        self.send(chat_id, &text, None).await?;
        self.finish_reading(sender, ActionTag::ForecastGenerated { period }, FlowCategory::Forecast)
            .await;
        Ok(())
    }

    async fn run_horoscope(
        &self,
        chat_id: i64,
        sender: &UserIdentity,
        date: BirthDate,
        kind: HoroscopeKind,
    ) -> Result<(), FlowError> {
        let life = life_path_number(&date);
        let prompt = prompts::horoscope(&date, life, kind, Utc::now().date_naive());
        let text = self.generate(&prompt, PromptStyle::Horoscope, fallback_reply()).await;
        self.send(chat_id, &text, None).await?;
        self.finish_reading(sender, ActionTag::HoroscopeGenerated { kind }, FlowCategory::Horoscope)
            .await;
        Ok(())
    }

    async fn run_affirmation(
        &self,
        chat_id: i64,
        sender: &UserIdentity,
        date: BirthDate,
    ) -> Result<(), FlowError> {
        let life = life_path_number(&date);
        let prompt = prompts::affirmation(&date, life, Utc::now().date_naive());
        let affirmation = self.generate(&prompt, PromptStyle::Default, fallback_affirmation(life)).await;
        let reply = format!("{affirmation}\n\nNumber of the day: {}", number_of_the_day());
        self.send(chat_id, &reply, None).await?;
        self.finish_reading(sender, ActionTag::AffirmationGenerated, FlowCategory::Affirmation)
            .await;
        Ok(())
    }

    async fn run_stats(&self, chat_id: i64, sender: &UserIdentity) -> Result<(), FlowError> {
        if !self.admin_ids.contains(&sender.id) {
            return self.send(chat_id, STATS_DENIED, None).await;
        }

        let counters = self.store.counters().await;
        let today = counters.day(Utc::now().date_naive());
        let summary = format!(
            "Users: {users}\nReadings, lifetime: {lifetime}\nReadings today: {today_total}\n\
             Portraits: {portraits} | Compatibility: {compat} | Forecasts: {forecasts} | \
             Horoscopes: {horoscopes} | Affirmations: {affirmations}",
            users = self.store.user_count().await,
            lifetime = counters.lifetime.total_readings(),
            today_total = today.total_readings(),
            portraits = counters.lifetime.portraits,
            compat = counters.lifetime.compatibility_checks,
            forecasts = counters.lifetime.forecasts,
            horoscopes = counters.lifetime.horoscopes,
            affirmations = counters.lifetime.affirmations,
        );
        self.send(chat_id, &summary, None).await
    }

    /// Generate text, substituting `fallback` on any upstream failure.
    async fn generate(&self, prompt: &str, style: PromptStyle, fallback: &str) -> String {
        match self.generator.generate(prompt, style).await {
            Ok(text) => text,
            Err(error) => {
                let flow_error = map_oracle_error(error);
                warn!(error = %flow_error, "generation failed; using local fallback");
                fallback.to_owned()
            }
        }
    }

    async fn finish_reading(&self, sender: &UserIdentity, tag: ActionTag, category: FlowCategory) {
        self.store.append_action(sender.id, ActionRecord::new(tag)).await;
        self.store.increment_counter(category, Utc::now().date_naive()).await;
        self.store.bump_requests(sender.id).await;
    }

    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<crate::keyboards::ReplyMarkup>,
    ) -> Result<(), FlowError> {
        self.api
            .send_message(chat_id, text, markup)
            .await
            .map_err(|error| FlowError::Delivery(error.to_string()))
    }
}

fn map_oracle_error(error: OracleError) -> FlowError {
    match error {
        OracleError::Timeout { timeout_secs } => FlowError::UpstreamTimeout { timeout_secs },
        other => FlowError::Upstream(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use numera_core::errors::FlowError;
    use numera_core::history::{ActionTag, ForecastPeriod};
    use numera_core::numerology::{fallback_affirmation, fallback_reply};
    use numera_oracle::{NoopTextGenerator, OracleError, PromptStyle, TextGenerator};
    use numera_store::{StateStore, UserIdentity};
    use tempfile::TempDir;

    use super::EventProcessor;
    use crate::api::RecordingBotApi;
    use crate::update::InboundEvent;

    struct ScriptedGenerator {
        reply: String,
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str, _style: PromptStyle) -> Result<String, OracleError> {
            Ok(self.reply.clone())
        }
    }

    struct TimingOutGenerator;

    #[async_trait]
    impl TextGenerator for TimingOutGenerator {
        async fn generate(&self, _prompt: &str, _style: PromptStyle) -> Result<String, OracleError> {
            Err(OracleError::Timeout { timeout_secs: 90 })
        }
    }

    struct Fixture {
        _dir: TempDir,
        store: Arc<StateStore>,
        api: Arc<RecordingBotApi>,
        processor: EventProcessor,
    }

    async fn fixture(generator: Arc<dyn TextGenerator>, admin_ids: Vec<i64>) -> Fixture {
        let dir = TempDir::new().expect("tempdir");
        let store = Arc::new(StateStore::open(dir.path()).await.expect("open store"));
        let api = Arc::new(RecordingBotApi::new());
        let processor =
            EventProcessor::new(store.clone(), generator, api.clone(), admin_ids);
        Fixture { _dir: dir, store, api, processor }
    }

    fn text_event(user_id: i64, text: &str) -> InboundEvent {
        InboundEvent::TextMessage {
            chat_id: user_id,
            sender: UserIdentity {
                id: user_id,
                username: None,
                first_name: Some("Jane".to_owned()),
                last_name: None,
            },
            text: text.to_owned(),
        }
    }

    #[tokio::test]
    async fn start_welcomes_with_the_main_menu_and_records_the_action() {
        let fx = fixture(Arc::new(NoopTextGenerator), vec![]).await;
        fx.processor.process(text_event(1, "/start")).await.expect("process");

        let sent = fx.api.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("Jane"));
        assert!(sent[0].markup.is_some());
        assert_eq!(fx.store.history(1).await.last().map(|r| r.tag), Some(ActionTag::Started));
        assert_eq!(fx.store.counters().await.lifetime.new_users, 1);
    }

    #[tokio::test]
    async fn generated_portrait_reaches_the_user_and_updates_the_store() {
        let generator = Arc::new(ScriptedGenerator { reply: "Your portrait.".to_owned() });
        let fx = fixture(generator, vec![]).await;

        fx.processor.process(text_event(2, "15.05.1990")).await.expect("process");

        let sent = fx.api.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Your portrait.");
        assert_eq!(
            fx.store.history(2).await.last().map(|r| r.tag),
            Some(ActionTag::PortraitGenerated)
        );
        assert_eq!(fx.store.counters().await.lifetime.portraits, 1);
        assert_eq!(fx.store.profile(2).await.expect("profile").total_requests, 1);
    }

    #[tokio::test]
    async fn generation_timeout_degrades_to_the_deterministic_fallback() {
        let fx = fixture(Arc::new(TimingOutGenerator), vec![]).await;

        fx.processor.process(text_event(3, "15.05.1990")).await.expect("process");

        let sent = fx.api.sent();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].text.is_empty());
        assert_eq!(sent[0].text, fallback_reply());
        // The reading still counts even though it came from the fallback.
        assert_eq!(fx.store.counters().await.lifetime.portraits, 1);
    }

    #[tokio::test]
    async fn affirmation_fallback_is_keyed_by_the_life_path_number() {
        let fx = fixture(Arc::new(NoopTextGenerator), vec![]).await;

        // AffirmationRequested first, so the bare date routes to affirmation.
        fx.processor
            .process(text_event(4, "My affirmation of the day"))
            .await
            .expect("menu");
        fx.processor.process(text_event(4, "15.05.1990")).await.expect("date");

        let sent = fx.api.sent();
        assert_eq!(sent.len(), 2);
        // 15.05.1990 reduces to life path 3.
        assert!(sent[1].text.contains(fallback_affirmation(3)));
        assert!(sent[1].text.contains("Number of the day"));
        assert_eq!(fx.store.counters().await.lifetime.affirmations, 1);
    }

    #[tokio::test]
    async fn two_dates_run_the_compatibility_flow() {
        let generator = Arc::new(ScriptedGenerator { reply: "You match.".to_owned() });
        let fx = fixture(generator, vec![]).await;

        fx.processor.process(text_event(5, "15.05.1990 20.08.1985")).await.expect("process");

        assert_eq!(fx.api.sent()[0].text, "You match.");
        assert_eq!(
            fx.store.history(5).await.last().map(|r| r.tag),
            Some(ActionTag::CompatibilityGenerated)
        );
        assert_eq!(fx.store.counters().await.lifetime.compatibility_checks, 1);
    }

    #[tokio::test]
    async fn forecast_button_pins_the_period_for_the_following_date() {
        let generator = Arc::new(ScriptedGenerator { reply: "Quarter ahead.".to_owned() });
        let fx = fixture(generator, vec![]).await;
        let sender = UserIdentity { id: 6, ..UserIdentity::default() };

        fx.processor
            .process(InboundEvent::Callback {
                chat_id: 6,
                sender: sender.clone(),
                callback_id: "cb-1".to_owned(),
                data: "forecast:quarter".to_owned(),
            })
            .await
            .expect("callback");
        fx.processor.process(text_event(6, "15.05.1990")).await.expect("date");

        assert_eq!(fx.api.answered(), vec!["cb-1".to_owned()]);
        assert_eq!(
            fx.store.history(6).await.last().map(|r| r.tag),
            Some(ActionTag::ForecastGenerated { period: ForecastPeriod::Quarter })
        );
        assert_eq!(fx.store.counters().await.lifetime.forecasts, 1);
    }

    #[tokio::test]
    async fn unknown_text_gets_format_guidance_without_counting_a_reading() {
        let fx = fixture(Arc::new(NoopTextGenerator), vec![]).await;

        fx.processor.process(text_event(7, "what is my future")).await.expect("process");

        let sent = fx.api.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("DD.MM.YYYY"));
        assert_eq!(fx.store.counters().await.lifetime.total_readings(), 0);
    }

    #[tokio::test]
    async fn stats_are_gated_on_the_admin_list() {
        let fx = fixture(Arc::new(NoopTextGenerator), vec![10]).await;

        fx.processor.process(text_event(10, "Bot statistics")).await.expect("admin");
        fx.processor.process(text_event(11, "Bot statistics")).await.expect("stranger");

        let sent = fx.api.sent();
        assert!(sent[0].text.contains("Users: "));
        assert!(sent[1].text.contains("administrators"));
    }

    #[tokio::test]
    async fn delivery_failure_surfaces_as_a_flow_error() {
        let dir = TempDir::new().expect("tempdir");
        let store = Arc::new(StateStore::open(dir.path()).await.expect("open store"));
        let api = Arc::new(RecordingBotApi::failing());
        let processor = EventProcessor::new(
            store,
            Arc::new(NoopTextGenerator),
            api,
            vec![],
        );

        let result = processor.process(text_event(8, "/start")).await;
        assert!(matches!(result, Err(FlowError::Delivery(_))));
    }

    #[tokio::test]
    async fn unsupported_updates_are_dropped_silently() {
        let fx = fixture(Arc::new(NoopTextGenerator), vec![]).await;
        fx.processor
            .process(InboundEvent::Unsupported { update_id: 9 })
            .await
            .expect("process");
        assert!(fx.api.sent().is_empty());
        assert_eq!(fx.store.user_count().await, 0);
    }
}
