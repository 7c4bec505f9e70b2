//! reqwest implementation of [`AgendaBackend`].

use async_trait::async_trait;
use exam_agenda_core::dto::{
    AddExamRequest, AgendaDetailDto, ApiEnvelope, ExamCatalogDto, ImportCompleteRequest,
    ImportCompleteResponse, PendingResponse, ProfileDto, ProfileExamDto, RemoveByAppointmentRequest,
    RemoveByCpfRequest,
};
use exam_agenda_core::{ExamDetail, RowKey};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::AgendaBackend;
use crate::config::AgendaConfig;
use crate::error::{ApiError, ApiResult};

/// HTTP client for the agenda REST API.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout_secs: u64,
}

impl HttpBackend {
    pub fn new(config: &AgendaConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            token: config.token.clone(),
            timeout_secs: config.timeout.as_secs(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_connect() {
            ApiError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            ApiError::Timeout(self.timeout_secs)
        } else {
            ApiError::Client(e.to_string())
        }
    }

    /// Send and turn non-2xx into [`ApiError::Status`].
    async fn send(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), body = %body, "Backend returned error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> ApiResult<T> {
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// GET an enveloped list; a missing `dados` is an empty list.
    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<Vec<T>> {
        tracing::debug!(endpoint = path, "GET");
        let response = self.send(self.request(Method::GET, path).query(query)).await?;
        let envelope: ApiEnvelope<Vec<T>> = self.read_json(response).await?;
        envelope
            .into_result()
            .map(Option::unwrap_or_default)
            .map_err(ApiError::Rejected)
    }

    /// Write call whose body, if any, may carry `sucesso: false`.
    async fn send_ack<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<()> {
        tracing::debug!(endpoint = path, method = %method, "Write");
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = self.send(builder).await?;
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        check_ack(&text)
    }
}

/// Empty and non-JSON bodies count as success; only an explicit
/// `sucesso: false` is a rejection.
fn check_ack(body: &str) -> ApiResult<()> {
    if body.trim().is_empty() {
        return Ok(());
    }
    match serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body) {
        Ok(envelope) => envelope.into_result().map(|_| ()).map_err(ApiError::Rejected),
        Err(_) => Ok(()),
    }
}

fn row_path(key: &RowKey) -> String {
    format!(
        "/agenda-detalhe/agendamento/{}/paciente/{}/exame",
        key.appointment_id, key.cpf
    )
}

#[async_trait]
impl AgendaBackend for HttpBackend {
    async fn agenda_details(&self, unit_id: Option<i64>) -> ApiResult<Vec<AgendaDetailDto>> {
        let query: Vec<(&str, String)> = unit_id
            .map(|id| ("idUnidade", id.to_string()))
            .into_iter()
            .collect();
        let details: Vec<AgendaDetailDto> = self.get_list("/agenda-detalhe", &query).await?;
        tracing::info!(unit_id = ?unit_id, rows = details.len(), "Loaded agenda details");
        Ok(details)
    }

    async fn exam_by_id(&self, exam_id: i64) -> ApiResult<Option<ExamCatalogDto>> {
        let path = format!("/exames/{}", exam_id);
        let response = match self.send(self.request(Method::GET, &path)).await {
            Err(ApiError::Status { status: 404, .. }) => return Ok(None),
            other => other?,
        };
        let envelope: ApiEnvelope<ExamCatalogDto> = self.read_json(response).await?;
        envelope.into_result().map_err(ApiError::Rejected)
    }

    async fn profiles(&self) -> ApiResult<Vec<ProfileDto>> {
        self.get_list("/grupo-mestre", &[]).await
    }

    async fn profile_exams(&self, group_id: i64) -> ApiResult<Vec<ProfileExamDto>> {
        self.get_list(&format!("/grupos-exames/{}", group_id), &[])
            .await
    }

    async fn search_exams(&self, term: &str, limit: usize) -> ApiResult<Vec<ExamCatalogDto>> {
        let query = [
            ("pagina", "1".to_string()),
            ("tamanhoPagina", limit.to_string()),
            ("filtro", term.to_string()),
        ];
        self.get_list("/exames", &query).await
    }

    async fn import_patient_complete(
        &self,
        request: &ImportCompleteRequest,
    ) -> ApiResult<ImportCompleteResponse> {
        let path = "/paciente/importar-completo";
        let response = self
            .send(self.request(Method::POST, path).json(request))
            .await?;
        let body: ImportCompleteResponse = self.read_json(response).await?;
        if body.is_rejected() {
            return Err(ApiError::Rejected(
                body.mensagem
                    .unwrap_or_else(|| "import rejected by backend".to_string()),
            ));
        }
        Ok(body)
    }

    async fn add_exam(&self, key: &RowKey, exam: &ExamDetail, unit_id: i64) -> ApiResult<()> {
        let body = AddExamRequest::from_exam(exam, unit_id);
        self.send_ack(Method::POST, &row_path(key), Some(&body))
            .await
    }

    async fn remove_exam(&self, key: &RowKey, exam_id: i64) -> ApiResult<()> {
        let path = format!("{}/{}", row_path(key), exam_id);
        self.send_ack::<()>(Method::DELETE, &path, None).await
    }

    async fn remove_by_cpf(&self, cpfs: &[String]) -> ApiResult<()> {
        let body = RemoveByCpfRequest {
            cpfs: cpfs.to_vec(),
        };
        self.send_ack(Method::POST, "/agenda-detalhe/remover-por-cpf", Some(&body))
            .await
    }

    async fn remove_by_appointment(&self, keys: &[RowKey]) -> ApiResult<()> {
        let body = RemoveByAppointmentRequest::from_keys(keys);
        self.send_ack(
            Method::POST,
            "/agenda-detalhe/remover-por-agendamento",
            Some(&body),
        )
        .await
    }

    async fn process_pending(&self, cpfs: &[String]) -> ApiResult<PendingResponse> {
        let path = "/db-sync/processa-pendentes";
        tracing::debug!(endpoint = path, patients = cpfs.len(), "POST");
        let response = self
            .send(self.request(Method::POST, path).json(cpfs))
            .await?;
        self.read_json(response).await
    }
}
