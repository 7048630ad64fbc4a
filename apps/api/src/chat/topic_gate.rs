//! Keyword classifier that keeps the chat on procurement topics.
//!
//! Three tiers over the lower-cased message, first match wins:
//!   1. any forbidden keyword rejects, even next to an allowed topic
//!   2. any explicit allowed topic accepts
//!   3. any contextual stem ("licit", "contrat", ...) accepts
//!
//! Everything else is rejected as out of scope.

use serde::Serialize;

pub const ALLOWED_TOPICS: &[&str] = &[
    "compras públicas",
    "licitações",
    "termo de referência",
    "etp",
    "estudo técnico preliminar",
    "lei 14.133/21",
    "lei 14133",
    "pregão eletrônico",
    "concorrência",
    "dispensa",
    "inexigibilidade",
    "modalidades de licitação",
    "contratos públicos",
    "administração pública",
    "tribunal de contas",
    "controle interno",
    "fiscalização",
    "penalidades",
    "sanções administrativas",
    "registro de preços",
    "ata de registro de preços",
    "sistema de registro de preços",
    "pncp",
    "portal nacional de contratações públicas",
    "comprasnet",
    "fornecedores",
    "habilitação",
    "qualificação técnica",
    "proposta comercial",
    "julgamento",
    "recursos administrativos",
    "impugnação",
    "sustentabilidade",
    "critérios de sustentabilidade",
    "margem de preferência",
    "micro e pequenas empresas",
    "cooperativas",
    "agricultura familiar",
];

pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "receita culinária",
    "receita de bolo",
    "como cozinhar",
    "futebol",
    "esporte",
    "filme",
    "música",
    "entretenimento",
    "relacionamento",
    "amor",
    "namoro",
    "casamento",
    "viagem",
    "turismo",
    "medicina",
    "saúde",
    "doença",
    "remédio",
    "tratamento médico",
    "programação",
    "código",
    "python",
    "javascript",
    "html",
    "css",
    "banco de dados",
    "inteligência artificial",
    "machine learning",
    "deep learning",
];

const CONTEXT_STEMS: &[&str] = &[
    "contrat", "licit", "compra", "aquisi", "fornec", "serviç", "obra", "público",
    "administra", "governo", "estado", "município", "edital", "proposta", "orçamento",
    "preço", "valor", "custo", "fiscal", "controle", "auditoria", "tribunal", "tcu", "cgu",
    "transparência", "portal", "sistema", "registro", "ata", "penalidade", "sanção", "multa",
    "rescisão", "aditivo",
];

pub const FORBIDDEN_REASON: &str =
    "Sua pergunta parece estar fora do escopo de compras públicas e licitações.";
pub const OUT_OF_SCOPE_REASON: &str =
    "Não identifiquei sua pergunta como relacionada a compras públicas ou licitações.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicVerdict {
    pub allowed: bool,
    pub reason: &'static str,
}

impl TopicVerdict {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: "",
        }
    }

    fn reject(reason: &'static str) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

pub fn check_allowed(message: &str) -> TopicVerdict {
    let lower = message.to_lowercase();
    let mentions = |list: &[&str]| list.iter().any(|k| lower.contains(k));

    if mentions(FORBIDDEN_KEYWORDS) {
        return TopicVerdict::reject(FORBIDDEN_REASON);
    }

    if mentions(ALLOWED_TOPICS) {
        return TopicVerdict::allow();
    }

    // Fuzzy fallback for messages that name no explicit topic.
    if mentions(CONTEXT_STEMS) {
        return TopicVerdict::allow();
    }

    TopicVerdict::reject(OUT_OF_SCOPE_REASON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_keyword_wins_over_allowed_topic() {
        let verdict = check_allowed("Qual a receita de bolo para um evento de licitação?");
        assert!(!verdict.allowed);
        assert_eq!(verdict.reason, FORBIDDEN_REASON);
    }

    #[test]
    fn test_explicit_topic_is_allowed() {
        assert!(check_allowed("Como funciona o pregão eletrônico?").allowed);
        assert!(check_allowed("O que muda na LEI 14.133/21?").allowed);
    }

    #[test]
    fn test_allowed_topic_accepts_without_any_stem() {
        let message = "dúvidas sobre habilitação";
        assert!(!CONTEXT_STEMS.iter().any(|s| message.contains(s)));
        assert!(check_allowed(message).allowed);
    }

    #[test]
    fn test_context_stem_is_allowed() {
        let message = "Posso prorrogar um contrato de limpeza?";
        assert!(!ALLOWED_TOPICS.iter().any(|t| message.to_lowercase().contains(t)));
        assert!(check_allowed(message).allowed);
    }

    #[test]
    fn test_unrelated_message_is_rejected() {
        let verdict = check_allowed("Quero saber sobre jardinagem");
        assert!(!verdict.allowed);
        assert_eq!(verdict.reason, OUT_OF_SCOPE_REASON);
    }
}
