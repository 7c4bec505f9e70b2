//! Write-side payloads: complete import, exam edits, transfer, soft delete.

use serde::{Deserialize, Serialize};

use super::loose;
use crate::models::{DiabetesFlag, ExamDetail, PatientImportRecord, RowKey};

/// Body of `POST /paciente/importar-completo`.
///
/// Creates or updates the patient, the appointment and one agenda row per
/// exam of the profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportCompleteRequest {
    pub id_unidade: i64,
    pub id_grupo_exame: i64,
    pub data_agendamento: String,
    pub cpf_paciente: String,
    pub nome: String,
    pub genero: String,
    pub data_nascimento: String,
    pub tipo_tratamento: String,
    pub diabetes: DiabetesFlag,
    pub peso: f64,
    pub altura: f64,
}

impl ImportCompleteRequest {
    pub fn from_record(
        record: &PatientImportRecord,
        appointment_date: &str,
        group_id: i64,
        unit_id: i64,
    ) -> Self {
        Self {
            id_unidade: unit_id,
            id_grupo_exame: group_id,
            data_agendamento: appointment_date.to_string(),
            cpf_paciente: record.cpf.clone(),
            nome: record.name.clone(),
            genero: record.gender.clone(),
            data_nascimento: record.birth_date.clone(),
            tipo_tratamento: record.treatment_type.clone(),
            diabetes: record.diabetes,
            peso: record.weight_kg,
            altura: record.height_m,
        }
    }
}

/// Response of the complete import. Id fields come in two casings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ImportCompleteResponse {
    #[serde(default)]
    pub sucesso: Option<bool>,

    #[serde(default)]
    pub mensagem: Option<String>,

    #[serde(
        rename = "idPaciente",
        alias = "id_paciente",
        default,
        deserialize_with = "loose::id"
    )]
    pub patient_id: Option<i64>,

    #[serde(
        rename = "idAgendamento",
        alias = "id_agendamento",
        default,
        deserialize_with = "loose::id"
    )]
    pub appointment_id: Option<i64>,

    #[serde(
        rename = "totalExames",
        alias = "total_exames_inseridos",
        default,
        deserialize_with = "loose::id"
    )]
    pub total_exams: Option<i64>,
}

impl ImportCompleteResponse {
    /// An explicit `sucesso: false`.
    pub fn is_rejected(&self) -> bool {
        self.sucesso == Some(false)
    }

    pub fn exam_count(&self) -> u32 {
        self.total_exams
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    }
}

/// Body of the add-exam call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddExamRequest {
    pub id_exame: i64,
    pub cd_exame: String,
    pub cd_exame_db: String,
    pub desc_exame: String,
    pub id_unidade: i64,
}

impl AddExamRequest {
    pub fn from_exam(exam: &ExamDetail, unit_id: i64) -> Self {
        Self {
            id_exame: exam.exam_id,
            cd_exame: exam.exam_code.clone(),
            cd_exame_db: exam.internal_db_code.clone(),
            desc_exame: exam.display_name.clone(),
            id_unidade: unit_id,
        }
    }
}

/// Body of the soft delete by CPF.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoveByCpfRequest {
    pub cpfs: Vec<String>,
}

/// One (appointment, patient) pair in a soft delete by appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRef {
    pub id_agendamento: i64,
    pub cpf: String,
}

impl From<&RowKey> for AppointmentRef {
    fn from(key: &RowKey) -> Self {
        Self {
            id_agendamento: key.appointment_id,
            cpf: key.cpf.clone(),
        }
    }
}

/// Body of the soft delete by appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoveByAppointmentRequest {
    pub agendamentos: Vec<AppointmentRef>,
}

impl RemoveByAppointmentRequest {
    pub fn from_keys(keys: &[RowKey]) -> Self {
        Self {
            agendamentos: keys.iter().map(AppointmentRef::from).collect(),
        }
    }
}

/// Per-CPF outcome of the pending transfer.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PendingResultDto {
    #[serde(default, deserialize_with = "loose::text")]
    pub cpf: String,
    #[serde(default, deserialize_with = "loose::flag")]
    pub enviado: bool,
    #[serde(default, deserialize_with = "loose::flag")]
    pub sucesso: bool,
    #[serde(default)]
    pub mensagem: Option<String>,
}

impl PendingResultDto {
    pub fn delivered(&self) -> bool {
        self.enviado || self.sucesso
    }
}

/// Response of `POST /db-sync/processa-pendentes`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PendingResponse {
    #[serde(default, deserialize_with = "loose::flag")]
    pub sucesso: bool,
    #[serde(default)]
    pub resultados: Option<Vec<PendingResultDto>>,
    #[serde(default)]
    pub mensagem: Option<String>,
}
