//! Consolidated agenda rows (`GET /agenda-detalhe`).
//!
//! The backend returns one row per (appointment, patient, exam); the listing
//! wants one row per (appointment, patient) with its exams nested.

use std::collections::HashMap;

use serde::Deserialize;

use super::catalog::ExamCatalogDto;
use super::loose;
use crate::models::{
    AppointmentPatientRow, DiabetesFlag, ExamDetail, RowKey, RowStatus, DEFAULT_MATERIAL,
};

/// One row of the denormalized agenda join.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AgendaDetailDto {
    #[serde(
        rename = "ID_AGENDAMENTO",
        alias = "iD_AGENDAMENTO",
        alias = "idAgendamento",
        alias = "id_agendamento",
        default,
        deserialize_with = "loose::id"
    )]
    pub appointment_id: Option<i64>,

    #[serde(
        rename = "ID_EXAME",
        alias = "iD_EXAME",
        alias = "idExame",
        alias = "id_exame",
        default,
        deserialize_with = "loose::id"
    )]
    pub exam_id: Option<i64>,

    #[serde(
        rename = "CPF_PACIENTE",
        alias = "cpF_PACIENTE",
        alias = "cPF_PACIENTE",
        alias = "cpfPaciente",
        alias = "cpf",
        default,
        deserialize_with = "loose::text"
    )]
    pub cpf: String,

    #[serde(
        rename = "ID_PACIENTE",
        alias = "iD_PACIENTE",
        alias = "idPaciente",
        default,
        deserialize_with = "loose::id"
    )]
    pub patient_id: Option<i64>,

    #[serde(
        rename = "ID_GRUPO_EXAME",
        alias = "iD_GRUPO_EXAME",
        alias = "idGrupoExame",
        default,
        deserialize_with = "loose::id"
    )]
    pub group_id: Option<i64>,

    #[serde(
        rename = "CD_EXAME_DB",
        alias = "cD_EXAME_DB",
        alias = "cdExameDB",
        alias = "cdExameDb",
        default,
        deserialize_with = "loose::text"
    )]
    pub internal_db_code: String,

    #[serde(
        rename = "DESC_EXAME",
        alias = "desC_EXAME",
        alias = "descExame",
        default,
        deserialize_with = "loose::text"
    )]
    pub description: String,

    #[serde(
        rename = "IND_REG_ENVIADO",
        alias = "inD_REG_ENVIADO",
        alias = "ind_reg_enviado",
        alias = "indRegEnviado",
        default,
        deserialize_with = "loose::flag"
    )]
    pub sent: bool,

    #[serde(
        rename = "DATA_AGENDAMENTO",
        alias = "datA_AGENDAMENTO",
        alias = "dataAgendamento",
        default,
        deserialize_with = "loose::text"
    )]
    pub appointment_date: String,

    #[serde(
        rename = "DATA_CADASTRO",
        alias = "datA_CADASTRO",
        alias = "dataCadastro",
        default,
        deserialize_with = "loose::text"
    )]
    pub registration_date: String,

    #[serde(
        rename = "NOME",
        alias = "nome",
        alias = "nomE_PACIENTE",
        alias = "NOME_PACIENTE",
        alias = "nomePaciente",
        default,
        deserialize_with = "loose::text"
    )]
    pub name: String,

    #[serde(
        rename = "TIPO_TRATAMENTO",
        alias = "tipO_TRATAMENTO",
        alias = "tipoTratamento",
        alias = "tratamento",
        default,
        deserialize_with = "loose::text"
    )]
    pub treatment: String,

    #[serde(rename = "DIABETES", alias = "diabetes", default)]
    pub diabetes: Option<DiabetesFlag>,

    #[serde(
        rename = "ID_UNIDADE",
        alias = "iD_UNIDADE",
        alias = "idUnidade",
        default,
        deserialize_with = "loose::id"
    )]
    pub unit_id: Option<i64>,

    #[serde(rename = "SIGLA", alias = "sigla", default, deserialize_with = "loose::text")]
    pub sigla: String,

    #[serde(
        rename = "MATERIAL",
        alias = "material",
        default,
        deserialize_with = "loose::text"
    )]
    pub material: String,
}

/// Date part of a backend timestamp (`2024-03-01T00:00:00` → `2024-03-01`).
pub fn date_part(timestamp: &str) -> &str {
    timestamp
        .split(|c: char| c == 'T' || c == ' ')
        .next()
        .unwrap_or_default()
}

fn first_non_empty<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().copied().find(|s| !s.is_empty())
}

fn exam_from_detail(
    detail: &AgendaDetailDto,
    exam_id: i64,
    catalog: Option<&ExamCatalogDto>,
) -> ExamDetail {
    let catalog_desc = catalog.map(|c| c.description.as_str()).unwrap_or_default();
    let catalog_code = catalog.map(|c| c.db_code()).unwrap_or_default();
    let catalog_sigla = catalog.map(|c| c.sigla.as_str()).unwrap_or_default();
    let catalog_material = catalog.map(|c| c.material.as_str()).unwrap_or_default();

    ExamDetail {
        exam_id,
        // The detail's own description wins over the catalog's
        display_name: first_non_empty(&[detail.description.as_str(), catalog_desc])
            .map(str::to_string)
            .unwrap_or_else(|| ExamDetail::placeholder_name(exam_id)),
        internal_db_code: first_non_empty(&[detail.internal_db_code.as_str(), catalog_code])
            .unwrap_or_default()
            .to_string(),
        exam_code: first_non_empty(&[catalog_sigla, detail.sigla.as_str()])
            .unwrap_or_default()
            .to_string(),
        group_id: detail.group_id,
        material: first_non_empty(&[catalog_material, detail.material.as_str()])
            .unwrap_or(DEFAULT_MATERIAL)
            .to_string(),
    }
}

/// Group detail rows into listing rows.
///
/// Rows keep the order in which their key first appears. Exams are
/// deduplicated by id. A row whose details are all marked sent loads as
/// `Sent` and read-only; anything else loads as `Correct`.
pub fn build_rows(
    details: &[AgendaDetailDto],
    catalog: &HashMap<i64, ExamCatalogDto>,
) -> Vec<AppointmentPatientRow> {
    struct Acc {
        row: AppointmentPatientRow,
        details: usize,
        sent: usize,
    }

    let mut index: HashMap<RowKey, usize> = HashMap::new();
    let mut acc: Vec<Acc> = Vec::new();

    for detail in details {
        let Some(appointment_id) = detail.appointment_id else {
            continue;
        };
        let key = RowKey::new(appointment_id, detail.cpf.clone());

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            acc.push(Acc {
                row: AppointmentPatientRow::new(key, ""),
                details: 0,
                sent: 0,
            });
            acc.len() - 1
        });
        let entry = &mut acc[slot];
        let row = &mut entry.row;

        entry.details += 1;
        if detail.sent {
            entry.sent += 1;
        }

        if row.name.is_empty() {
            row.name = detail.name.clone();
        }
        if row.treatment.is_empty() {
            row.treatment = detail.treatment.clone();
        }
        if !row.diabetes {
            row.diabetes = detail.diabetes.map(|d| d.is_yes()).unwrap_or(false);
        }
        if row.appointment_date.is_empty() {
            row.appointment_date = date_part(&detail.appointment_date).to_string();
        }
        if row.registration_date.is_empty() {
            row.registration_date = date_part(&detail.registration_date).to_string();
        }
        row.patient_id = row.patient_id.or(detail.patient_id);
        row.unit_id = row.unit_id.or(detail.unit_id);

        if let Some(exam_id) = detail.exam_id {
            if !row.has_exam(exam_id) {
                row.exams
                    .push(exam_from_detail(detail, exam_id, catalog.get(&exam_id)));
            }
        }
    }

    acc.into_iter()
        .map(|Acc { mut row, details, sent }| {
            let all_sent = details > 0 && sent == details;
            row.status = Some(if all_sent {
                RowStatus::Sent
            } else {
                RowStatus::Correct
            });
            row.editable = !all_sent;
            row
        })
        .collect()
}
