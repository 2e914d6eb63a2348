//! Chat Transport
//! チャット基盤との境界。本体はここで定義するトレイトだけに依存し、
//! 実体（Telegram Bot API）は telegram.rs の薄いアダプタが担う。

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
}

/// インラインボタン1個。data はコールバックで返る不透明ペイロード。
#[derive(Debug, Clone)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: &str, data: &str) -> Self {
        Self {
            label: label.to_string(),
            data: data.to_string(),
        }
    }
}

/// 受信イベント。発信者のユーザーIDと表示名を常に伴う。
#[derive(Debug, Clone)]
pub enum Event {
    Text {
        chat_id: i64,
        user_id: i64,
        user_name: String,
        text: String,
    },
    /// ボタン押下。message_id は押されたボタンの載っていたメッセージ。
    Callback {
        callback_id: String,
        chat_id: i64,
        message_id: i64,
        user_id: i64,
        user_name: String,
        data: String,
    },
    Photo {
        chat_id: i64,
        user_id: i64,
        user_name: String,
        file_id: String,
    },
    Video {
        chat_id: i64,
        user_id: i64,
        user_name: String,
        file_id: String,
    },
}

/// 送信面。buttons が空ならボタン無しで送る。
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Vec<Button>],
    ) -> Result<(), TransportError>;

    async fn send_photo(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: &str,
        buttons: &[Vec<Button>],
    ) -> Result<(), TransportError>;

    async fn send_video(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: &str,
        buttons: &[Vec<Button>],
    ) -> Result<(), TransportError>;

    async fn edit_text(&self, chat_id: i64, message_id: i64, text: &str)
        -> Result<(), TransportError>;

    /// 画像・動画メッセージのキャプション編集
    async fn edit_caption(
        &self,
        chat_id: i64,
        message_id: i64,
        caption: &str,
    ) -> Result<(), TransportError>;

    /// ボタン押下への応答。alert なら目立つポップアップで表示。
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TransportError>;
}

// ========================================
// テスト用モック（送信内容を記録するだけのインプロセス実装）
// ========================================

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Text { chat_id: i64, text: String },
        Photo { chat_id: i64, file_id: String, caption: String },
        Video { chat_id: i64, file_id: String, caption: String },
        EditText { chat_id: i64, message_id: i64, text: String },
        EditCaption { chat_id: i64, message_id: i64, caption: String },
        CallbackAnswer { text: Option<String>, alert: bool },
    }

    /// 送信を記録するモック。fail_file_ids に入れた画像の送信だけ失敗させ、
    /// 配信失敗がロールバックしないことの検証に使う。
    #[derive(Debug, Default)]
    pub struct MockTransport {
        pub sent: Mutex<Vec<Sent>>,
        pub fail_file_ids: Vec<String>,
    }

    impl MockTransport {
        pub fn sent_snapshot(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        /// 指定チャット宛てのテキストをまとめて返す（検証用）
        pub fn texts_to(&self, chat_id: i64) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter_map(|s| match s {
                    Sent::Text { chat_id: c, text } if *c == chat_id => Some(text.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn photos_to(&self, chat_id: i64) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter_map(|s| match s {
                    Sent::Photo { chat_id: c, file_id, .. } if *c == chat_id => {
                        Some(file_id.clone())
                    }
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl ChatTransport for MockTransport {
        async fn send_text(
            &self,
            chat_id: i64,
            text: &str,
            _buttons: &[Vec<Button>],
        ) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(Sent::Text {
                chat_id,
                text: text.to_string(),
            });
            Ok(())
        }

        async fn send_photo(
            &self,
            chat_id: i64,
            file_id: &str,
            caption: &str,
            _buttons: &[Vec<Button>],
        ) -> Result<(), TransportError> {
            if self.fail_file_ids.iter().any(|f| f == file_id) {
                return Err(TransportError::Api("blocked by user".to_string()));
            }
            self.sent.lock().unwrap().push(Sent::Photo {
                chat_id,
                file_id: file_id.to_string(),
                caption: caption.to_string(),
            });
            Ok(())
        }

        async fn send_video(
            &self,
            chat_id: i64,
            file_id: &str,
            caption: &str,
            _buttons: &[Vec<Button>],
        ) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(Sent::Video {
                chat_id,
                file_id: file_id.to_string(),
                caption: caption.to_string(),
            });
            Ok(())
        }

        async fn edit_text(
            &self,
            chat_id: i64,
            message_id: i64,
            text: &str,
        ) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(Sent::EditText {
                chat_id,
                message_id,
                text: text.to_string(),
            });
            Ok(())
        }

        async fn edit_caption(
            &self,
            chat_id: i64,
            message_id: i64,
            caption: &str,
        ) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(Sent::EditCaption {
                chat_id,
                message_id,
                caption: caption.to_string(),
            });
            Ok(())
        }

        async fn answer_callback(
            &self,
            _callback_id: &str,
            text: Option<&str>,
            alert: bool,
        ) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(Sent::CallbackAnswer {
                text: text.map(|t| t.to_string()),
                alert,
            });
            Ok(())
        }
    }
}
