use crate::etp::{Answers, QUESTIONS};

use super::sections::{outline, SectionSpec};
use super::strategy::{GenerationContext, GenerationMode};

pub const COMPLETE_SYSTEM: &str = "Você é um especialista em elaboração de Estudos Técnicos \
    Preliminares conforme a Lei nº 14.133/2021. Gere conteúdo técnico, detalhado, formal e em \
    total conformidade com a legislação de licitações e contratos públicos. Mantenha linguagem \
    administrativa apropriada e estrutura lógica.";

pub const FAST_SYSTEM: &str = "Especialista em ETP. Gere conteúdo técnico completo, conciso e \
    conforme a Lei nº 14.133/2021. Seja direto e eficiente.";

/// Renders answers, document excerpt and knowledge-base excerpts for a prompt.
/// `document_chars` caps the document excerpt.
pub fn render_context(answers: &Answers, context: &GenerationContext, document_chars: usize) -> String {
    let mut out = String::from("RESPOSTAS DO USUÁRIO:\n");
    for q in &QUESTIONS {
        out.push_str(&format!(
            "- {} {}\n",
            q.text,
            answers.get_or(q.id, "Não informado")
        ));
    }
    out.push_str(&render_references(context, document_chars));
    out
}

/// Document excerpt and knowledge-base excerpts only; empty when neither exists.
pub fn render_references(context: &GenerationContext, document_chars: usize) -> String {
    let mut out = String::new();

    if let Some(excerpt) = context.document_excerpt(document_chars) {
        out.push_str("\nDOCUMENTO ANEXADO (trecho):\n");
        out.push_str(&excerpt);
        out.push('\n');
    }

    if !context.knowledge.is_empty() {
        out.push_str("\nBASE DE CONHECIMENTO (referência):\n");
        for entry in &context.knowledge {
            out.push_str(&format!("[{}]\n{}\n\n", entry.filename, entry.content));
        }
    }

    out
}

/// One-line answer summary used by the terse fast prompts.
pub fn compact_answers(answers: &Answers) -> String {
    format!(
        "Necessidade: {} | PCA: {} | Normas: {} | Valores: {} | Parcelamento: {}",
        answers.get_or(1, "não informada"),
        answers.get_or(2, "não informado"),
        answers.get_or(3, "Lei nº 14.133/2021"),
        answers.get_or(4, "a definir por pesquisa de mercado"),
        answers.get_or(5, "não informado"),
    )
}

fn mode_label(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::Preview => "prévia para revisão",
        GenerationMode::Final => "versão final",
    }
}

pub fn complete_section_prompt(section: &SectionSpec, context: &str, mode: GenerationMode) -> String {
    let mut prompt = format!(
        "Gere o conteúdo da seção \"{heading}\" de um Estudo Técnico Preliminar ({label}) \
         conforme a Lei nº 14.133/2021.\n\n\
         DESCRIÇÃO DA SEÇÃO: {description}\n\n\
         ESTRUTURA REQUERIDA:\n- Título principal: {heading}\n",
        heading = section.heading(),
        label = mode_label(mode),
        description = section.description,
    );

    if !section.subsections.is_empty() {
        prompt.push_str("- Subseções obrigatórias:\n");
        for sub in section.subsections {
            prompt.push_str(&format!("  • {sub}\n"));
        }
    }

    prompt.push_str(&format!(
        "\nREQUISITOS DE CONTEÚDO:\n\
         - Mínimo de {} parágrafos bem elaborados, de 4 a 8 linhas cada\n\
         - Linguagem administrativa formal, impessoal e técnica\n\
         - Cite artigos da Lei nº 14.133/2021 quando relevante\n\
         - Mantenha coerência com o contexto fornecido\n",
        section.min_paragraphs
    ));

    if section.requires_table {
        prompt.push_str("- INCLUA uma tabela em markdown (linhas com |) com os valores ou riscos da seção\n");
    }

    prompt.push_str(&format!(
        "\nCONTEXTO:\n{context}\n\
         Inicie com o título da seção exatamente como \"{}\" em linha própria e gere o conteúdo completo da seção.\n\n{}",
        section.heading(),
        crate::llm_client::prompts::PLAIN_TEXT_INSTRUCTION
    ));

    prompt
}

pub fn optimized_prompt(context: &str, mode: GenerationMode) -> String {
    format!(
        "Gere um Estudo Técnico Preliminar ({label}) com TODAS as 14 seções obrigatórias da \
         Lei nº 14.133/2021, cada uma com 6 a 8 parágrafos.\n\n\
         {context}\n\
         ESTRUTURA OBRIGATÓRIA, NESTA ORDEM:\n{sections}\n\
         INSTRUÇÕES CRÍTICAS:\n\
         - TODAS as 14 seções são obrigatórias, numeradas de 1 a 14\n\
         - Baseie-se nos dados fornecidos no contexto\n\
         - Inclua tabelas nas seções 4 e 13\n\
         - Comece diretamente por \"1. INTRODUÇÃO\"\n\n{plain}",
        label = mode_label(mode),
        sections = outline(1..=14, true),
        plain = crate::llm_client::prompts::PLAIN_TEXT_INSTRUCTION,
    )
}

/// Terse prompt for the fast strategy, covering the sections in `range`.
/// `references` is the output of [`render_references`].
pub fn fast_prompt(
    answers: &Answers,
    references: &str,
    range: std::ops::RangeInclusive<u8>,
    mode: GenerationMode,
) -> String {
    let whole = *range.start() == 1 && *range.end() == 14;
    let scope = if whole {
        "o ETP COMPLETO com as 14 seções obrigatórias".to_string()
    } else {
        format!("as seções {} a {} do ETP", range.start(), range.end())
    };
    format!(
        "Gere {scope} ({label}) conforme a Lei nº 14.133/2021. Seja conciso mas técnico.\n\n\
         DADOS: {data}\n{references}\n\
         SEÇÕES (6 parágrafos cada):\n{sections}\n\
         Comece diretamente pela primeira seção listada. {plain}",
        label = mode_label(mode),
        data = compact_answers(answers),
        sections = outline(range, false),
        plain = crate::llm_client::prompts::PLAIN_TEXT_INSTRUCTION,
    )
}

pub fn adjustment_prompt(current_body: &str, feedback: &str) -> String {
    format!(
        "Revise o Estudo Técnico Preliminar abaixo conforme as observações do usuário.\n\n\
         OBSERVAÇÕES:\n{feedback}\n\n\
         REGRAS:\n\
         - Mantenha as 14 seções numeradas e seus títulos\n\
         - Altere apenas o necessário para atender às observações\n\
         - Devolva o documento revisado completo, sem comentários\n\n\
         DOCUMENTO ATUAL:\n{current_body}\n\n{plain}",
        plain = crate::llm_client::prompts::PLAIN_TEXT_INSTRUCTION,
    )
}
