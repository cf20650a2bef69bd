use serde::ser::{ Serialize, SerializeMap, Serializer };

pub const MSG_LOAD_FAILED: &str = "Erro ao carregar imagem";
pub const MSG_NOT_RECOGNIZED: &str = "Placa não reconhecida ou formato inválido";
pub const MSG_FILE_NOT_FOUND: &str = "Arquivo não encontrado";
pub const MSG_USAGE: &str = "Uso: plate-recognition <caminho_da_imagem>";

/// Outcome of one recognition run, printed as a single JSON object.
#[derive(Debug, Clone, PartialEq)]
pub enum PlateRecord {
    Success {
        license_plate: String,
        confidence: f32,
    },
    Failure {
        message: String,
        /// only present when OCR ran but its text was rejected
        raw_text: Option<String>,
        confidence: Option<f32>,
    },
}

impl PlateRecord {
    pub fn success(license_plate: impl Into<String>, confidence: f32) -> Self {
        PlateRecord::Success { license_plate: license_plate.into(), confidence }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        PlateRecord::Failure { message: message.into(), raw_text: None, confidence: None }
    }

    pub fn not_recognized(raw_text: impl Into<String>, confidence: f32) -> Self {
        PlateRecord::Failure {
            message: MSG_NOT_RECOGNIZED.to_string(),
            raw_text: Some(raw_text.into()),
            confidence: Some(confidence),
        }
    }

    pub fn unexpected(error: impl std::fmt::Display) -> Self {
        Self::failure(format!("Erro ao processar imagem: {}", error))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PlateRecord::Success { .. })
    }
}

impl Serialize for PlateRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PlateRecord::Success { license_plate, confidence } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("licensePlate", license_plate)?;
                map.serialize_entry("confidence", confidence)?;
                map.end()
            }
            PlateRecord::Failure { message, raw_text, confidence } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("message", message)?;
                if let Some(raw_text) = raw_text {
                    map.serialize_entry("rawText", raw_text)?;
                }
                if let Some(confidence) = confidence {
                    map.serialize_entry("confidence", confidence)?;
                }
                map.end()
            }
        }
    }
}
