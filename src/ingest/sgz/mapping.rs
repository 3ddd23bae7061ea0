use std::collections::HashMap;

/// Canonical fields of a work-order record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    OrderNumber,
    Status,
    ServiceType,
    Company,
    OpenedAt,
    StatusChangedAt,
    District,
    Neighborhood,
    Street,
    StreetNumber,
    ZipCode,
}

impl Field {
    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::OrderNumber => "ordem de serviço",
            Self::Status => "status",
            Self::ServiceType => "serviço",
            Self::Company => "empresa",
            Self::OpenedAt => "data de abertura",
            Self::StatusChangedAt => "data do status",
            Self::District => "distrito",
            Self::Neighborhood => "bairro",
            Self::Street => "logradouro",
            Self::StreetNumber => "número",
            Self::ZipCode => "cep",
        }
    }

    /// Ordered alias list for this field, in priority order. Aliases are
    /// written pre-normalized (lowercase, accent-folded, single spaces) so
    /// they compare directly against `normalize_header` output.
    ///
    /// Every known export variant of the upstream system belongs here, not in
    /// scattered conditionals; the first alias that resolves to a non-empty
    /// cell wins and later ones are never consulted.
    pub(crate) const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::OrderNumber => &["ordem de servico", "numero os", "no os", "n os", "os"],
            Self::Status => &["status", "status os", "situacao", "situacao os"],
            Self::ServiceType => &[
                "servico",
                "tipo de servico",
                "descricao do servico",
                "classificacao",
            ],
            Self::Company => &["empresa", "contratada", "executora", "fornecedor"],
            Self::OpenedAt => &[
                "data de abertura",
                "dt abertura",
                "data criacao",
                "data de criacao",
                "abertura",
            ],
            Self::StatusChangedAt => &[
                "data do status",
                "dt status",
                "ultima atualizacao",
                "data ultima movimentacao",
            ],
            Self::District => &["distrito", "prefeitura regional", "subprefeitura"],
            Self::Neighborhood => &["bairro"],
            Self::Street => &["logradouro", "endereco", "rua"],
            Self::StreetNumber => &["numero", "num", "nro"],
            Self::ZipCode => &["cep"],
        }
    }
}

/// Fields whose columns must be present (under some alias) before any row is
/// persisted. Individual cells may still be blank; only the header matters.
pub(crate) const REQUIRED_FIELDS: [Field; 5] = [
    Field::OrderNumber,
    Field::Status,
    Field::ServiceType,
    Field::OpenedAt,
    Field::District,
];

/// Resolve a field against one raw row: first alias with a non-empty value.
pub(crate) fn resolve<'a>(row: &'a HashMap<String, String>, field: Field) -> Option<&'a str> {
    field.aliases().iter().find_map(|alias| {
        row.get(*alias)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    })
}

/// Which required fields have no matching column in the header at all.
pub(crate) fn missing_required_columns(headers: &[String]) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| {
            !field
                .aliases()
                .iter()
                .any(|alias| headers.iter().any(|header| header == alias))
        })
        .map(|field| field.label())
        .collect()
}
