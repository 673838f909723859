//! HTTP transport for the remote agent API.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::wire::{
    AgentMessageDto, AvailableModelsDto, ChatMessageRequestDto, ChatMessageResponseDto,
    ChatSummaryDto, DeleteChatResponseDto, ErrorBodyDto, FileMetadataDto, NextChatIdDto,
    UpdateChatNameRequestDto, UpdateChatNameResponseDto, UploadResponseDto,
};
use crate::api::{AgentApi, ApiFuture, DocumentUpload, SendRequest};
use crate::core::config::ApiConfig;
use crate::core::errors::{SyncError, SyncResult};
use crate::core::ids::ChatId;
use crate::core::types::{
    ChatMessage, ChatSummary, DeleteOutcome, Document, GeneratedFile, ModelInfo, UploadAck,
};

const OCTET_STREAM: &str = "application/octet-stream";

/// Remote agent API over HTTP/JSON.
pub struct HttpAgentApi {
    client: Client,
    base_url: Url,
}

impl HttpAgentApi {
    /// Build the transport from configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &ApiConfig) -> SyncResult<Self> {
        // A trailing slash keeps Url::join from eating the last segment.
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> SyncResult<Url> {
        self.base_url.join(path).map_err(SyncError::from)
    }

    fn chat_path(suffix: &str, chat: &ChatId) -> String {
        let encoded = urlencoding::encode(chat.as_str());
        format!("{suffix}/{encoded}")
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> SyncResult<T> {
        let url = self.endpoint(path)?;
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    /// Decode a response body, surfacing the server's `detail` on failure.
    async fn decode<T: DeserializeOwned>(response: Response) -> SyncResult<T> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            return serde_json::from_str(&body).map_err(SyncError::from);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBodyDto>(&body)
            .map(|parsed| parsed.detail)
            .unwrap_or(body);
        Err(SyncError::Status {
            status: status.as_u16(),
            detail,
        })
    }
}

impl AgentApi for HttpAgentApi {
    fn list_chats(&self) -> ApiFuture<'_, SyncResult<Vec<ChatSummary>>> {
        Box::pin(async move {
            let rows: Vec<ChatSummaryDto> = self.get_json("api/chats").await?;
            rows.into_iter().map(ChatSummary::try_from).collect()
        })
    }

    fn next_chat_id(&self) -> ApiFuture<'_, SyncResult<ChatId>> {
        Box::pin(async move {
            let dto: NextChatIdDto = self.get_json("api/chats/next-id").await?;
            ChatId::new(&dto.next_chat_id).map_err(SyncError::from)
        })
    }

    fn chat_history(&self, chat: ChatId) -> ApiFuture<'_, SyncResult<Vec<ChatMessage>>> {
        Box::pin(async move {
            let path = Self::chat_path("api/chats", &chat);
            let rows: Vec<AgentMessageDto> = self.get_json(&path).await?;
            rows.into_iter().map(ChatMessage::try_from).collect()
        })
    }

    fn post_message(
        &self,
        chat: ChatId,
        request: SendRequest,
    ) -> ApiFuture<'_, SyncResult<Vec<ChatMessage>>> {
        Box::pin(async move {
            let path = format!("{}/messages", Self::chat_path("api/chats", &chat));
            let url = self.endpoint(&path)?;
            let (model_provider, model_name) = match request.model {
                Some(model) => (Some(model.provider), Some(model.name)),
                None => (None, None),
            };
            let body = ChatMessageRequestDto {
                message: request.message,
                model_provider,
                model_name,
            };
            let response = self.client.post(url).json(&body).send().await?;
            let dto: ChatMessageResponseDto = Self::decode(response).await?;
            dto.messages.into_iter().map(ChatMessage::try_from).collect()
        })
    }

    fn rename_chat(&self, chat: ChatId, name: String) -> ApiFuture<'_, SyncResult<String>> {
        Box::pin(async move {
            let path = format!("{}/name", Self::chat_path("api/chats", &chat));
            let url = self.endpoint(&path)?;
            let body = UpdateChatNameRequestDto { chat_name: name };
            let response = self.client.put(url).json(&body).send().await?;
            let dto: UpdateChatNameResponseDto = Self::decode(response).await?;
            Ok(dto.chat_name)
        })
    }

    fn delete_chat(&self, chat: ChatId) -> ApiFuture<'_, SyncResult<DeleteOutcome>> {
        Box::pin(async move {
            let path = Self::chat_path("api/chats", &chat);
            let url = self.endpoint(&path)?;
            let response = self.client.delete(url).send().await?;
            let dto: DeleteChatResponseDto = Self::decode(response).await?;
            Ok(DeleteOutcome::from(dto))
        })
    }

    fn list_documents(&self, chat: ChatId) -> ApiFuture<'_, SyncResult<Vec<Document>>> {
        Box::pin(async move {
            let path = Self::chat_path("api/files/uploads", &chat);
            let rows: Vec<FileMetadataDto> = self.get_json(&path).await?;
            rows.into_iter().map(FileMetadataDto::into_document).collect()
        })
    }

    fn list_generated(&self, chat: ChatId) -> ApiFuture<'_, SyncResult<Vec<GeneratedFile>>> {
        Box::pin(async move {
            let path = Self::chat_path("api/files/generated", &chat);
            let rows: Vec<FileMetadataDto> = self.get_json(&path).await?;
            rows.into_iter().map(FileMetadataDto::into_generated).collect()
        })
    }

    fn upload_document(
        &self,
        chat: ChatId,
        upload: DocumentUpload,
    ) -> ApiFuture<'_, SyncResult<UploadAck>> {
        Box::pin(async move {
            let url = self.endpoint("api/files/upload")?;
            let mime = upload
                .content_type
                .unwrap_or_else(|| OCTET_STREAM.to_string());
            let part = Part::bytes(upload.bytes)
                .file_name(upload.file_name)
                .mime_str(&mime)?;
            let form = Form::new()
                .text("chat_id", chat.into_string())
                .part("file", part);
            let response = self.client.post(url).multipart(form).send().await?;
            let dto: UploadResponseDto = Self::decode(response).await?;
            UploadAck::try_from(dto)
        })
    }

    fn list_models(&self) -> ApiFuture<'_, SyncResult<Vec<ModelInfo>>> {
        Box::pin(async move {
            let dto: AvailableModelsDto = self.get_json("api/models").await?;
            Ok(dto.models.into_iter().map(ModelInfo::from).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn transport(base: &str) -> HttpAgentApi {
        let config = ApiConfig {
            base_url: base.to_string(),
            ..ApiConfig::default()
        };
        HttpAgentApi::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_joins_relative_paths() {
        let api = transport("http://127.0.0.1:8000");
        let url = api.endpoint("api/chats").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/chats");
    }

    #[test]
    fn test_endpoint_preserves_base_path_prefix() {
        let api = transport("http://gateway.local/agent");
        let url = api.endpoint("api/models").unwrap();
        assert_eq!(url.as_str(), "http://gateway.local/agent/api/models");
    }

    #[test]
    fn test_chat_path_percent_encodes_ids() {
        let chat = ChatId::new("7/èxt").unwrap();
        let path = HttpAgentApi::chat_path("api/chats", &chat);
        assert_eq!(path, "api/chats/7%2F%C3%A8xt");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = ApiConfig {
            base_url: "not a url".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            HttpAgentApi::new(&config),
            Err(SyncError::Url(_))
        ));
    }
}
