//! ERP wire types.
//!
//! Field names follow the gateway's contract verbatim; the Rust side uses
//! descriptive names and maps through serde renames.

use serde::{Deserialize, Deserializer, Serialize};

/// ERP-issued order identifier ("prenota").
///
/// The gateway encodes it as either a JSON string or a number depending on
/// the backend version; both decode into one canonical string here at the
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentNumber(String);

impl DocumentNumber {
    /// Wraps an already-canonical document number.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the empty document number.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for DocumentNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
            Float(f64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Int(n) => Self(n.to_string()),
            Raw::Float(n) => Self(format!("{n:.0}")),
        })
    }
}

/// Customer upsert payload.
///
/// The gateway upserts by `cpfCnpj` when `atualizaExistente` is set; fields
/// the marketplace does not supply carry the fixed profile the ERP expects.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerUpsert {
    #[serde(rename = "codigoCliente")]
    pub customer_code: String,
    #[serde(rename = "codigoTipoCliente")]
    pub customer_type_code: u32,
    #[serde(rename = "codigoRamo")]
    pub branch_code: String,
    #[serde(rename = "codigoClasse")]
    pub class_code: u32,
    #[serde(rename = "codigoClasseTipo")]
    pub class_type_code: String,
    #[serde(rename = "codigoEstadoCivil")]
    pub marital_status_code: String,
    #[serde(rename = "prefixoCelular")]
    pub mobile_prefix: String,
    #[serde(rename = "telefoneCelular")]
    pub mobile_phone: String,
    #[serde(rename = "prefixoComercial")]
    pub commercial_prefix: String,
    #[serde(rename = "telefoneComercial")]
    pub commercial_phone: String,
    #[serde(rename = "prefixoResidencial")]
    pub residential_prefix: String,
    #[serde(rename = "telefoneResidencial")]
    pub residential_phone: String,
    #[serde(rename = "codigoNacionalidade")]
    pub nationality_code: String,
    #[serde(rename = "codigoProfissao")]
    pub profession_code: String,
    #[serde(rename = "paiCliente")]
    pub father_name: String,
    #[serde(rename = "maeCliente")]
    pub mother_name: String,
    #[serde(rename = "emailCliente")]
    pub email: String,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "sexo")]
    pub gender: String,
    #[serde(rename = "nascimento")]
    pub birth_date: String,
    #[serde(rename = "cpfCnpj")]
    pub document: String,
    #[serde(rename = "rgIe")]
    pub state_id: String,
    #[serde(rename = "ssp")]
    pub issuing_agency: String,
    #[serde(rename = "atualizaExistente")]
    pub update_existing: bool,
    #[serde(rename = "clienteRevendedor")]
    pub reseller: bool,
}

/// Address upsert payload, keyed by the same customer code.
#[derive(Debug, Clone, Serialize)]
pub struct AddressUpsert {
    #[serde(rename = "codigoCliente")]
    pub customer_code: String,
    #[serde(rename = "clienteTipoEndereco")]
    pub address_type: u32,
    #[serde(rename = "codCidades")]
    pub city_code: String,
    #[serde(rename = "CEP")]
    pub postal_code: String,
    #[serde(rename = "rua")]
    pub street: String,
    #[serde(rename = "complemento")]
    pub complement: String,
    #[serde(rename = "bairro")]
    pub neighborhood: String,
    #[serde(rename = "uf")]
    pub state: String,
    #[serde(rename = "numeroEndereco")]
    pub street_number: String,
    #[serde(rename = "nomePropriedade")]
    pub property_name: String,
    #[serde(rename = "inscricaoEstadual")]
    pub state_registration: String,
    #[serde(rename = "fachada")]
    pub facade: String,
    #[serde(rename = "contato")]
    pub contact: String,
    #[serde(rename = "telefoneContato")]
    pub contact_phone: String,
    #[serde(rename = "prefixoTelefoneContato")]
    pub contact_phone_prefix: String,
}

/// Canonical order submission payload.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSubmission {
    #[serde(rename = "COD_PEDIDO_WEB")]
    pub web_order_id: u64,
    #[serde(rename = "COD_CLIENTE")]
    pub customer_code: String,
    #[serde(rename = "TIPO_ENDERECO")]
    pub address_type: u32,
    #[serde(rename = "COD_TRANSPORTADORA")]
    pub carrier_code: u32,
    #[serde(rename = "VALOR_FRETE_TOTAL")]
    pub freight_total: f64,
    #[serde(rename = "CNPJ_INTERMED")]
    pub intermediary_tax_id: String,
    #[serde(rename = "IDENT_CAD_INTERMED")]
    pub intermediary_name: String,
    #[serde(rename = "NOME")]
    pub buyer_label: String,
    #[serde(rename = "Itens")]
    pub items: Vec<OrderItemPayload>,
    #[serde(rename = "Pagamentos")]
    pub payments: Vec<PaymentPayload>,
}

/// One resolved item in the order payload.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItemPayload {
    #[serde(rename = "COD_ITEM")]
    pub sku: String,
    #[serde(rename = "COD_FORNECEDOR")]
    pub supplier_code: String,
    #[serde(rename = "PRECO_UNITARIO")]
    pub unit_price: f64,
    #[serde(rename = "QTDE")]
    pub quantity: u32,
}

/// Payment entry in the order payload.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentPayload {
    #[serde(rename = "codigoBandeira")]
    pub brand_code: String,
    #[serde(rename = "tipoCartao")]
    pub card_kind: String,
    #[serde(rename = "dataPagamento")]
    pub payment_date: String,
    #[serde(rename = "numeroCartao")]
    pub card_number: String,
    #[serde(rename = "numeroAutorizacao")]
    pub authorization_number: String,
    #[serde(rename = "quantidadeParcelas")]
    pub installments: u32,
}

/// Acknowledgement envelope on every gateway response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GatewayAck {
    #[serde(rename = "sucesso", default = "default_success")]
    pub success: bool,
    #[serde(rename = "mensagem", default)]
    pub message: String,
}

/// Order-submission response carrying the document number.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubmitResponse {
    #[serde(rename = "sucesso", default = "default_success")]
    pub success: bool,
    #[serde(rename = "mensagem", default)]
    pub message: String,
    #[serde(default)]
    pub data: SubmitData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SubmitData {
    #[serde(rename = "codigoPedido", default)]
    pub document_number: Option<DocumentNumber>,
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub data: TokenData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TokenData {
    #[serde(default)]
    pub token: String,
}

// Older gateway builds omit the flag on success responses.
fn default_success() -> bool {
    true
}
