use crate::etp::QUESTIONS;

pub const ANALYZER_SYSTEM: &str = "Você é um especialista em análise de documentos de \
    licitação e ETP. Analise documentos e extraia informações específicas de forma precisa.";

/// Characters of document text sent to the model.
pub const ANALYSIS_INPUT_CHARS: usize = 4000;

pub fn analysis_prompt(document_text: &str) -> String {
    let questions: String = QUESTIONS
        .iter()
        .map(|q| format!("{}. {}\n", q.id, q.text))
        .collect();
    let excerpt: String = document_text.chars().take(ANALYSIS_INPUT_CHARS).collect();

    format!(
        "Analise o documento fornecido e extraia as informações que respondam às \
         perguntas do ETP:\n\n{questions}\n\
         DOCUMENTO:\n{excerpt}\n\n\
         Retorne um objeto JSON com exatamente estes campos:\n\
         - \"extracted_answers\": objeto com as respostas encontradas (chave: número da \
           pergunta como texto, valor: resposta)\n\
         - \"missing_info\": lista com os números das perguntas que não puderam ser respondidas\n\
         - \"confidence\": objeto com o nível de confiança de cada resposta (0 a 1)\n\
         - \"summary\": resumo do documento em até 3 frases\n\n\
         Não invente respostas: omita perguntas cuja resposta não está no documento."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_caps_document_text() {
        let doc = "x".repeat(ANALYSIS_INPUT_CHARS + 500);
        let prompt = analysis_prompt(&doc);
        assert!(prompt.contains(&"x".repeat(ANALYSIS_INPUT_CHARS)));
        assert!(!prompt.contains(&"x".repeat(ANALYSIS_INPUT_CHARS + 1)));
        assert!(prompt.contains("5. Haverá parcelamento da contratação?"));
    }
}
