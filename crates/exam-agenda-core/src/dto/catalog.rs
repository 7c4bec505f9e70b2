//! Exam catalog and exam profile payloads.

use serde::Deserialize;

use super::loose;
use crate::models::{ExamDetail, ExamProfile, DEFAULT_MATERIAL};

/// An exam from `GET /exames/{id}` or the exam search.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExamCatalogDto {
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
        rename = "DS_EXAME",
        alias = "dS_EXAME",
        alias = "dsExame",
        alias = "ds_exame",
        default,
        deserialize_with = "loose::text"
    )]
    pub description: String,

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
        rename = "CD_EXAME",
        alias = "cD_EXAME",
        alias = "cdExame",
        default,
        deserialize_with = "loose::text"
    )]
    pub code: String,

    #[serde(
        rename = "SIGLA",
        alias = "sigla",
        default,
        deserialize_with = "loose::text"
    )]
    pub sigla: String,

    #[serde(
        rename = "MATERIAL",
        alias = "material",
        default,
        deserialize_with = "loose::text"
    )]
    pub material: String,
}

impl ExamCatalogDto {
    /// Lab database code, falling back to the plain exam code.
    pub fn db_code(&self) -> &str {
        if self.internal_db_code.is_empty() {
            &self.code
        } else {
            &self.internal_db_code
        }
    }

    /// Canonical exam, `None` when the payload carries no id.
    pub fn to_exam_detail(&self, group_id: Option<i64>) -> Option<ExamDetail> {
        let exam_id = self.exam_id?;
        Some(ExamDetail {
            exam_id,
            exam_code: self.sigla.clone(),
            internal_db_code: self.db_code().to_string(),
            group_id,
            display_name: if self.description.is_empty() {
                ExamDetail::placeholder_name(exam_id)
            } else {
                self.description.clone()
            },
            material: if self.material.is_empty() {
                DEFAULT_MATERIAL.to_string()
            } else {
                self.material.clone()
            },
        })
    }
}

/// An exam profile from `GET /grupo-mestre`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProfileDto {
    #[serde(
        rename = "ID_GRUPO_EXAME",
        alias = "iD_GRUPO_EXAME",
        alias = "idGrupoExame",
        default,
        deserialize_with = "loose::id"
    )]
    pub group_id: Option<i64>,

    #[serde(
        rename = "DESC_GRUPO_EXAME",
        alias = "desC_GRUPO_EXAME",
        alias = "descGrupoExame",
        default,
        deserialize_with = "loose::text"
    )]
    pub name: String,

    #[serde(
        rename = "IND_REG_ATIVO",
        alias = "inD_REG_ATIVO",
        alias = "indRegAtivo",
        default = "active_by_default",
        deserialize_with = "loose::flag"
    )]
    pub active: bool,
}

fn active_by_default() -> bool {
    true
}

impl ProfileDto {
    pub fn to_profile(&self) -> Option<ExamProfile> {
        Some(ExamProfile::new(self.group_id?, self.name.clone()))
    }
}

/// Membership row from `GET /grupos-exames/{id}`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProfileExamDto {
    #[serde(
        rename = "ID_EXAME",
        alias = "iD_EXAME",
        alias = "idExame",
        default,
        deserialize_with = "loose::id"
    )]
    pub exam_id: Option<i64>,
}
