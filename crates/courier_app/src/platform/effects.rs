use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use courier_core::{ConversionOutcome, DeliveredArticle, Effect, Msg, PreferenceChange};
use courier_engine::{ConvertOptions, Delivery, Pipeline, PreferenceStore};
use courier_logging::{courier_error, courier_info, courier_warn};
use tokio::task::JoinHandle;

use super::messages::{delivery_failure, pipeline_failure};
use super::sessions::Sessions;

/// Outgoing side of a chat.
#[async_trait::async_trait]
pub trait ChatSink: Send + Sync {
    async fn reply(&self, chat_id: i64, text: &str);

    async fn typing(&self, chat_id: i64);
}

type Detached = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Runs conversation effects against the engine, the preference store and
/// the chat, feeding conversion results back into the conversation.
///
/// Conversions run on their own tasks so a chat keeps being served while one
/// is in flight.
pub struct EffectRunner {
    sessions: Sessions,
    prefs: Arc<dyn PreferenceStore>,
    pipeline: Pipeline,
    delivery: Arc<dyn Delivery>,
    sink: Arc<dyn ChatSink>,
    conversions: Mutex<Vec<JoinHandle<()>>>,
}

impl EffectRunner {
    pub fn new(
        sessions: Sessions,
        prefs: Arc<dyn PreferenceStore>,
        pipeline: Pipeline,
        delivery: Arc<dyn Delivery>,
        sink: Arc<dyn ChatSink>,
    ) -> Self {
        Self {
            sessions,
            prefs,
            pipeline,
            delivery,
            sink,
            conversions: Mutex::new(Vec::new()),
        }
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    /// Processes `msg` and every follow-up message its effects produce.
    /// Returns once the effects are applied; conversions finish later.
    pub async fn handle(self: &Arc<Self>, chat_id: i64, msg: Msg) {
        let mut queue = VecDeque::from([msg]);
        while let Some(msg) = queue.pop_front() {
            for effect in self.sessions.dispatch(chat_id, msg) {
                if let Some(follow_up) = self.execute(chat_id, effect).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    /// Waits until every started conversion has reported back.
    pub async fn idle(&self) {
        loop {
            let pending: Vec<JoinHandle<()>> = match self.conversions.lock() {
                Ok(mut conversions) => conversions.drain(..).collect(),
                Err(poisoned) => poisoned.into_inner().drain(..).collect(),
            };
            if pending.is_empty() {
                return;
            }
            for handle in pending {
                if let Err(err) = handle.await {
                    courier_error!("Conversion task failed: {}", err);
                }
            }
        }
    }

    async fn execute(self: &Arc<Self>, chat_id: i64, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::Reply(text) => {
                self.sink.reply(chat_id, &text).await;
                None
            }
            Effect::ShowTyping => {
                self.sink.typing(chat_id).await;
                None
            }
            Effect::SaveKindleEmail(email) => {
                let result = self.prefs.set_kindle_email(chat_id, &email);
                if let Err(err) = &result {
                    courier_error!("Failed to save Kindle email for chat {}: {}", chat_id, err);
                }
                Some(Msg::PreferenceSaved {
                    change: PreferenceChange::KindleEmail(email),
                    saved: result.is_ok(),
                })
            }
            Effect::SetImageLinks(enabled) => {
                let result = self.prefs.set_preserve_image_links(chat_id, enabled);
                if let Err(err) = &result {
                    courier_error!("Failed to save image link setting for chat {}: {}", chat_id, err);
                }
                Some(Msg::PreferenceSaved {
                    change: PreferenceChange::ImageLinks(enabled),
                    saved: result.is_ok(),
                })
            }
            Effect::ConvertAndDeliver {
                url,
                to,
                preserve_image_links,
            } => {
                let task = tokio::spawn(self.clone().deliver_in_background(
                    chat_id,
                    url,
                    to,
                    preserve_image_links,
                ));
                let mut conversions = match self.conversions.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                conversions.retain(|handle| !handle.is_finished());
                conversions.push(task);
                None
            }
        }
    }

    // Boxed so the task type does not depend on `handle`, which it calls.
    fn deliver_in_background(
        self: Arc<Self>,
        chat_id: i64,
        url: String,
        to: String,
        preserve_image_links: bool,
    ) -> Detached {
        Box::pin(async move {
            let outcome = self
                .convert_and_deliver(chat_id, &url, &to, preserve_image_links)
                .await;
            self.handle(chat_id, Msg::ConversionFinished { url, outcome })
                .await;
        })
    }

    async fn convert_and_deliver(
        &self,
        chat_id: i64,
        url: &str,
        to: &str,
        preserve_image_links: bool,
    ) -> ConversionOutcome {
        let options = ConvertOptions {
            preserve_image_links,
        };
        let converted = match self.pipeline.convert(url, &options).await {
            Ok(converted) => converted,
            Err(err) => {
                courier_warn!("Conversion of {} failed while {}: {}", url, err.stage(), err);
                return ConversionOutcome::Failed {
                    message: pipeline_failure(&err),
                };
            }
        };

        if let Err(err) = self
            .delivery
            .send(&converted.epub, &converted.filename, to)
            .await
        {
            courier_warn!("Delivery of {} to {} failed: {}", converted.filename, to, err);
            return ConversionOutcome::Failed {
                message: delivery_failure(&err),
            };
        }

        courier_info!("Delivered '{}' for chat {}", converted.record.title, chat_id);
        if let Err(err) = self.prefs.record_delivery(chat_id, &Utc::now().to_rfc3339()) {
            courier_warn!("Failed to record delivery for chat {}: {}", chat_id, err);
        }

        ConversionOutcome::Delivered(DeliveredArticle {
            title: converted.record.title,
            author: converted.record.author,
            publication: converted.record.publication,
            missing_images: converted.missing_images,
        })
    }
}
