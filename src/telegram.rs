//! Telegram Bot API Adapter
//! Bot API への薄い HTTP アダプタ。ここに業務ロジックは置かない。

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::transport::{Button, ChatTransport, Event, TransportError};

/// getUpdates のロングポーリング秒数
const POLL_TIMEOUT_SECS: u64 = 30;

pub struct TelegramApi {
    http: reqwest::Client,
    base: String,
}

impl TelegramApi {
    pub fn new(token: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base: format!("https://api.telegram.org/bot{}", token),
        }
    }

    async fn call(&self, method: &str, payload: Value) -> Result<Value, TransportError> {
        let resp: ApiResponse = self
            .http
            .post(format!("{}/{}", self.base, method))
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if !resp.ok {
            return Err(TransportError::Api(
                resp.description
                    .unwrap_or_else(|| format!("{} failed", method)),
            ));
        }
        Ok(resp.result)
    }

    /// ロングポーリングで更新を受け取り、イベント列と次回 offset を返す
    pub async fn get_updates(&self, offset: i64) -> Result<(Vec<Event>, i64), TransportError> {
        let result = self
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"],
                }),
            )
            .await?;

        let updates: Vec<Update> = serde_json::from_value(result)
            .map_err(|e| TransportError::Api(format!("unexpected getUpdates payload: {}", e)))?;

        let mut next_offset = offset;
        let mut events = Vec::new();
        for update in updates {
            next_offset = next_offset.max(update.update_id + 1);
            match update.into_event() {
                Some(event) => events.push(event),
                None => {} // サポート外の更新は読み飛ばす
            }
        }
        Ok((events, next_offset))
    }
}

fn keyboard(buttons: &[Vec<Button>]) -> Option<Value> {
    if buttons.is_empty() {
        return None;
    }
    let rows: Vec<Vec<Value>> = buttons
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.label, "callback_data": b.data }))
                .collect()
        })
        .collect();
    Some(json!({ "inline_keyboard": rows }))
}

#[async_trait]
impl ChatTransport for TelegramApi {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Vec<Button>],
    ) -> Result<(), TransportError> {
        let mut payload = json!({ "chat_id": chat_id, "text": text });
        if let Some(markup) = keyboard(buttons) {
            payload["reply_markup"] = markup;
        }
        self.call("sendMessage", payload).await.map(|_| ())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: &str,
        buttons: &[Vec<Button>],
    ) -> Result<(), TransportError> {
        let mut payload = json!({ "chat_id": chat_id, "photo": file_id, "caption": caption });
        if let Some(markup) = keyboard(buttons) {
            payload["reply_markup"] = markup;
        }
        self.call("sendPhoto", payload).await.map(|_| ())
    }

    async fn send_video(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: &str,
        buttons: &[Vec<Button>],
    ) -> Result<(), TransportError> {
        let mut payload = json!({ "chat_id": chat_id, "video": file_id, "caption": caption });
        if let Some(markup) = keyboard(buttons) {
            payload["reply_markup"] = markup;
        }
        self.call("sendVideo", payload).await.map(|_| ())
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), TransportError> {
        self.call(
            "editMessageText",
            json!({ "chat_id": chat_id, "message_id": message_id, "text": text }),
        )
        .await
        .map(|_| ())
    }

    async fn edit_caption(
        &self,
        chat_id: i64,
        message_id: i64,
        caption: &str,
    ) -> Result<(), TransportError> {
        self.call(
            "editMessageCaption",
            json!({ "chat_id": chat_id, "message_id": message_id, "caption": caption }),
        )
        .await
        .map(|_| ())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TransportError> {
        let mut payload = json!({ "callback_query_id": callback_id, "show_alert": alert });
        if let Some(text) = text {
            payload["text"] = json!(text);
        }
        self.call("answerCallbackQuery", payload).await.map(|_| ())
    }
}

// ========================================
// Bot API ペイロード（必要なフィールドだけ拾う）
// ========================================

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    #[serde(default)]
    from: Option<User>,
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    video: Option<Video>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
    first_name: String,
    #[serde(default)]
    last_name: Option<String>,
}

impl User {
    fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct PhotoSize {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct Video {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message: Option<Message>,
}

impl Update {
    fn into_event(self) -> Option<Event> {
        if let Some(cb) = self.callback_query {
            let message = cb.message?;
            return Some(Event::Callback {
                callback_id: cb.id,
                chat_id: message.chat.id,
                message_id: message.message_id,
                user_id: cb.from.id,
                user_name: cb.from.full_name(),
                data: cb.data?,
            });
        }

        let message = self.message?;
        let from = message.from?;
        let chat_id = message.chat.id;
        let (user_id, user_name) = (from.id, from.full_name());

        if let Some(photo) = message.photo {
            // 最後の要素が最大解像度
            let file_id = photo.into_iter().last()?.file_id;
            return Some(Event::Photo {
                chat_id,
                user_id,
                user_name,
                file_id,
            });
        }
        if let Some(video) = message.video {
            return Some(Event::Video {
                chat_id,
                user_id,
                user_name,
                file_id: video.file_id,
            });
        }
        if let Some(text) = message.text {
            return Some(Event::Text {
                chat_id,
                user_id,
                user_name,
                text,
            });
        }

        warn!("テキスト・画像・動画以外のメッセージを無視します");
        None
    }
}
