//! Header → column mapping for delimited imports.
//!
//! Header tokens are compared after folding: accents stripped, lowercased,
//! punctuation dropped, whitespace collapsed. "Preço unit." and "preco unit"
//! are the same header.

use unicode_normalization::UnicodeNormalization;

use mqt_engine::schema::keys;
use mqt_engine::ColumnSchema;

/// Known spellings of each input column, already folded.
const ALIASES: &[(&str, &[&str])] = &[
    (keys::REFERENCE, &["ref", "referencia", "reference", "codigo", "cod", "code", "art", "artigo", "item", "n", "no"]),
    (keys::DESCRIPTION, &["desc", "descricao", "description", "designacao", "designation", "trabalho", "artigo descricao"]),
    (keys::UNIT, &["un", "und", "unid", "unidade", "unit", "uom"]),
    (keys::QUANTITY, &["qtd", "qt", "qty", "quant", "quantidade", "quantity", "medicao"]),
    (keys::UNIT_PRICE, &["preco", "preco unit", "preco unitario", "pu", "p unit", "unit price", "price", "valor unitario"]),
    (keys::EXECUTED_QUANTITY, &["qtd executada", "executado", "exec", "executed", "executed quantity", "qty executed", "quantidade executada"]),
    (keys::STATUS, &["estado", "status", "situacao"]),
];

/// Fold a header token for comparison.
pub fn fold_header(s: &str) -> String {
    let stripped: String = s
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .map(|c| if c == '_' || c == '-' || c == '/' { ' ' } else { c })
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve one header token to an input column key of `schema`.
///
/// Tries the alias table first, then the schema's own keys and labels.
/// Derived columns never match: their values are recomputed, not imported.
pub fn resolve_header(schema: &ColumnSchema, header: &str) -> Option<String> {
    let folded = fold_header(header);
    if folded.is_empty() {
        return None;
    }

    let from_alias = ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&folded.as_str()))
        .map(|(key, _)| *key);

    let key = from_alias.or_else(|| {
        schema
            .columns()
            .iter()
            .find(|c| fold_header(&c.key) == folded || fold_header(&c.label) == folded)
            .map(|c| c.key.as_str())
    })?;

    schema
        .column(key)
        .filter(|c| c.editable && !c.is_derived())
        .map(|c| c.key.clone())
}

/// Column mapping for a header record.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    /// For each header position, the column it feeds (if any).
    pub columns: Vec<Option<String>>,
    /// Headers that matched nothing, or a column already taken by an earlier header.
    pub ignored: Vec<String>,
}

impl HeaderMap {
    pub fn build<'a>(schema: &ColumnSchema, headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut map = HeaderMap::default();
        for header in headers {
            let column = resolve_header(schema, header)
                .filter(|key| !map.columns.iter().flatten().any(|taken| taken == key));
            if column.is_none() && !header.trim().is_empty() {
                map.ignored.push(header.trim().to_string());
            }
            map.columns.push(column);
        }
        map
    }

    pub fn mapped_count(&self) -> usize {
        self.columns.iter().flatten().count()
    }

    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.as_deref() == Some(key))
    }
}
