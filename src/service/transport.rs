use std::path::{Path, PathBuf};

use async_trait::async_trait;
use teloxide::{
    adaptors::Throttle,
    payloads::{AnswerInlineQuerySetters, EditMessageMediaInlineSetters, SendVideoSetters},
    prelude::Requester,
    types::{
        ChatAction, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InlineQueryResult, InlineQueryResultPhoto,
        InputFile, InputMedia, InputMediaVideo, Message, MessageId, ReplyParameters,
    },
    Bot, RequestError,
};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("telegram request failed: {0}")]
    Request(#[from] RequestError),
    #[error("relay upload returned no media: {0}")]
    MissingMedia(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    Url(Url),
    Local(PathBuf),
    /// Transport-native reference obtained from a relay upload.
    FileId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTarget {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Inline result shown while the video is still being resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub id: String,
    pub source_url: Url,
    pub thumbnail: Url,
    pub title: String,
    pub caption: String,
    pub source_button: String,
}

/// The messaging RPCs used by the pipeline. Every call can fail independently.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn notify_uploading(&self, chat_id: i64) -> Result<(), TransportError>;

    async fn reply_with_video(&self, target: ReplyTarget, video: VideoSource, caption: &str)
        -> Result<(), TransportError>;

    async fn answer_inline_query(&self, query_id: &str, placeholders: Vec<Placeholder>) -> Result<(), TransportError>;

    async fn edit_inline_media(
        &self,
        inline_message_id: &str,
        video: VideoSource,
        caption: &str,
    ) -> Result<(), TransportError>;

    async fn edit_inline_text(&self, inline_message_id: &str, text: &str) -> Result<(), TransportError>;

    /// Uploads a local file to the relay chat and returns its file id.
    async fn upload_to_relay(&self, path: &Path) -> Result<String, TransportError>;
}

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Throttle<Bot>,
    relay_chat_id: ChatId,
}

impl TelegramTransport {
    pub fn new(bot: Throttle<Bot>, relay_chat_id: i64) -> Self {
        Self {
            bot,
            relay_chat_id: ChatId(relay_chat_id),
        }
    }

    fn input_file(video: VideoSource) -> InputFile {
        match video {
            VideoSource::Url(url) => InputFile::url(url),
            VideoSource::Local(path) => InputFile::file(path),
            VideoSource::FileId(id) => InputFile::file_id(id),
        }
    }

    fn uploaded_file_id(message: &Message) -> Option<String> {
        message
            .video()
            .map(|v| v.file.id.clone())
            .or_else(|| message.animation().map(|a| a.file.id.clone()))
            .or_else(|| message.document().map(|d| d.file.id.clone()))
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn notify_uploading(&self, chat_id: i64) -> Result<(), TransportError> {
        self.bot.send_chat_action(ChatId(chat_id), ChatAction::UploadVideo).await?;
        Ok(())
    }

    async fn reply_with_video(
        &self,
        target: ReplyTarget,
        video: VideoSource,
        caption: &str,
    ) -> Result<(), TransportError> {
        self.bot
            .send_video(ChatId(target.chat_id), Self::input_file(video))
            .caption(caption)
            .supports_streaming(true)
            .reply_parameters(ReplyParameters::new(MessageId(target.message_id)))
            .await?;
        Ok(())
    }

    async fn answer_inline_query(&self, query_id: &str, placeholders: Vec<Placeholder>) -> Result<(), TransportError> {
        let results = placeholders.into_iter().map(|placeholder| {
            // The keyboard makes Telegram report an inline_message_id we can edit later.
            let keyboard = InlineKeyboardMarkup::new([[InlineKeyboardButton::url(
                placeholder.source_button,
                placeholder.source_url,
            )]]);

            InlineQueryResult::Photo(
                InlineQueryResultPhoto::new(placeholder.id, placeholder.thumbnail.clone(), placeholder.thumbnail)
                    .title(placeholder.title)
                    .caption(placeholder.caption)
                    .reply_markup(keyboard),
            )
        });

        self.bot
            .answer_inline_query(query_id, results)
            .cache_time(0)
            .is_personal(true)
            .await?;
        Ok(())
    }

    async fn edit_inline_media(
        &self,
        inline_message_id: &str,
        video: VideoSource,
        caption: &str,
    ) -> Result<(), TransportError> {
        let media = InputMedia::Video(
            InputMediaVideo::new(Self::input_file(video))
                .caption(caption)
                .supports_streaming(true),
        );

        self.bot
            .edit_message_media_inline(inline_message_id, media)
            .reply_markup(InlineKeyboardMarkup::default())
            .await?;
        Ok(())
    }

    async fn edit_inline_text(&self, inline_message_id: &str, text: &str) -> Result<(), TransportError> {
        self.bot.edit_message_text_inline(inline_message_id, text).await?;
        Ok(())
    }

    async fn upload_to_relay(&self, path: &Path) -> Result<String, TransportError> {
        let message = self
            .bot
            .send_video(self.relay_chat_id, InputFile::file(path.to_path_buf()))
            .supports_streaming(true)
            .disable_notification(true)
            .await?;

        Self::uploaded_file_id(&message).ok_or_else(|| TransportError::MissingMedia(path.display().to_string()))
    }
}
