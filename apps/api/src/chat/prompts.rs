pub const WELCOME_MESSAGE: &str = "Olá! Sou seu assistente especializado em compras públicas \
e licitações.

Posso ajudá-lo com dúvidas sobre:
• Lei 14.133/21 (Nova Lei de Licitações)
• Modalidades de licitação (pregão, concorrência, etc.)
• Elaboração de Termo de Referência e ETP
• Procedimentos de contratação pública
• Contratos administrativos
• Fiscalização e controle
• Portal Nacional de Contratações Públicas (PNCP)
• Sustentabilidade em compras públicas

Como posso ajudá-lo hoje?";

pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "Como elaborar um Termo de Referência?",
    "Quais são as modalidades de licitação da Lei 14.133/21?",
    "Como funciona o pregão eletrônico?",
    "Quais são os critérios de sustentabilidade obrigatórios?",
    "Como fazer a fiscalização de contratos?",
    "O que é o PNCP e como utilizá-lo?",
    "Quais são as penalidades previstas na lei?",
    "Como funciona o sistema de registro de preços?",
];

pub const APOLOGY_MESSAGE: &str = "Desculpe, ocorreu um erro ao processar sua pergunta. \
Tente novamente em alguns instantes.";

pub const CHAT_SYSTEM: &str = "Você é um assistente especializado em compras públicas e \
licitações no Brasil.

INSTRUÇÕES:
1. Responda APENAS sobre compras públicas, licitações e administração pública
2. Baseie suas respostas na Lei 14.133/21 (Nova Lei de Licitações) e legislação correlata
3. Seja preciso, técnico e didático
4. Cite artigos da lei quando relevante
5. Forneça exemplos práticos quando possível
6. Se não souber algo específico, diga isso e sugira consultar a legislação";

/// Fixed answer for messages the topic gate rejects.
pub fn refusal(reason: &str) -> String {
    format!(
        "Desculpe, mas só posso responder perguntas relacionadas a compras públicas e \
         licitações.\n\n{reason}\n\nQue tal me perguntar sobre:\n\
         • Como elaborar um Termo de Referência?\n\
         • Quais são as modalidades de licitação da Lei 14.133/21?\n\
         • Como funciona o pregão eletrônico?\n\
         • Critérios de sustentabilidade em compras públicas?\n\
         • Procedimentos de fiscalização contratual?"
    )
}
