/// One mandated section of the ETP.
#[derive(Debug, Clone, Copy)]
pub struct SectionSpec {
    pub number: u8,
    pub title: &'static str,
    pub subsections: &'static [&'static str],
    pub description: &'static str,
    /// Paragraph floor requested by the Complete strategy.
    pub min_paragraphs: u8,
    pub requires_table: bool,
}

impl SectionSpec {
    /// Canonical heading line, e.g. "4. ESTIMATIVA DAS QUANTIDADES E VALORES".
    pub fn heading(&self) -> String {
        format!("{}. {}", self.number, self.title)
    }
}

pub const SECTION_COUNT: usize = 14;

pub const SECTIONS: [SectionSpec; SECTION_COUNT] = [
    SectionSpec {
        number: 1,
        title: "INTRODUÇÃO",
        subsections: &[],
        description: "Apresentação geral do documento e contexto da contratação",
        min_paragraphs: 8,
        requires_table: false,
    },
    SectionSpec {
        number: 2,
        title: "OBJETO DO ESTUDO E ESPECIFICAÇÕES GERAIS",
        subsections: &[
            "2.1 Localização da execução do objeto contratual",
            "2.2 Natureza e finalidade do objeto",
            "2.3 Classificação quanto ao sigilo",
            "2.4 Descrição da necessidade da contratação",
            "2.5 Demonstração da previsão no plano de contratações anual",
        ],
        description: "Definição detalhada do objeto e especificações",
        min_paragraphs: 10,
        requires_table: false,
    },
    SectionSpec {
        number: 3,
        title: "DESCRIÇÃO DOS REQUISITOS DA CONTRATAÇÃO",
        subsections: &[
            "3.1 Requisitos técnicos",
            "3.2 Requisitos de sustentabilidade",
            "3.3 Requisitos normativos e legais",
        ],
        description: "Especificação de todos os requisitos aplicáveis",
        min_paragraphs: 9,
        requires_table: false,
    },
    SectionSpec {
        number: 4,
        title: "ESTIMATIVA DAS QUANTIDADES E VALORES",
        subsections: &[],
        description: "Quantificação e valoração dos itens da contratação",
        min_paragraphs: 8,
        requires_table: true,
    },
    SectionSpec {
        number: 5,
        title: "LEVANTAMENTO DE MERCADO E JUSTIFICATIVA DA ESCOLHA DA SOLUÇÃO",
        subsections: &[
            "5.1 Justificativa para a escolha da solução",
            "5.2 Pesquisa de mercado",
        ],
        description: "Análise de mercado e justificativa técnica",
        min_paragraphs: 10,
        requires_table: false,
    },
    SectionSpec {
        number: 6,
        title: "ESTIMATIVA DO VALOR DA CONTRATAÇÃO",
        subsections: &[],
        description: "Consolidação dos valores estimados",
        min_paragraphs: 8,
        requires_table: true,
    },
    SectionSpec {
        number: 7,
        title: "DESCRIÇÃO DA SOLUÇÃO COMO UM TODO",
        subsections: &[],
        description: "Visão integrada da solução proposta",
        min_paragraphs: 10,
        requires_table: false,
    },
    SectionSpec {
        number: 8,
        title: "JUSTIFICATIVA PARA O PARCELAMENTO OU NÃO DA CONTRATAÇÃO",
        subsections: &[],
        description: "Análise sobre divisão ou não da contratação",
        min_paragraphs: 8,
        requires_table: false,
    },
    SectionSpec {
        number: 9,
        title: "DEMONSTRATIVO DOS RESULTADOS PRETENDIDOS",
        subsections: &[],
        description: "Resultados esperados com a contratação",
        min_paragraphs: 9,
        requires_table: false,
    },
    SectionSpec {
        number: 10,
        title: "PROVIDÊNCIAS ADOTADAS ANTERIORMENTE PELA ADMINISTRAÇÃO",
        subsections: &[],
        description: "Histórico de ações relacionadas",
        min_paragraphs: 8,
        requires_table: false,
    },
    SectionSpec {
        number: 11,
        title: "CONTRATAÇÕES CORRELATAS OU INTERDEPENDENTES",
        subsections: &[],
        description: "Análise de contratos relacionados",
        min_paragraphs: 8,
        requires_table: false,
    },
    SectionSpec {
        number: 12,
        title: "AVALIAÇÃO DOS IMPACTOS AMBIENTAIS",
        subsections: &[],
        description: "Análise de impactos ambientais ou justificativa de não aplicabilidade",
        min_paragraphs: 8,
        requires_table: false,
    },
    SectionSpec {
        number: 13,
        title: "ANÁLISE DE RISCOS",
        subsections: &[],
        description: "Identificação e análise de riscos",
        min_paragraphs: 9,
        requires_table: true,
    },
    SectionSpec {
        number: 14,
        title: "CONCLUSÃO E POSICIONAMENTO FINAL",
        subsections: &[],
        description: "Posicionamento técnico conclusivo sobre a viabilidade",
        min_paragraphs: 8,
        requires_table: false,
    },
];

/// Sections whose number falls in `range`, in order.
pub fn sections_in(range: std::ops::RangeInclusive<u8>) -> impl Iterator<Item = &'static SectionSpec> {
    SECTIONS.iter().filter(move |s| range.contains(&s.number))
}

/// Compact outline used by the batched prompts: heading, subsections and an
/// optional table hint per section.
pub fn outline(range: std::ops::RangeInclusive<u8>, with_subsections: bool) -> String {
    let mut out = String::new();
    for section in sections_in(range) {
        out.push_str(&section.heading());
        if section.requires_table {
            out.push_str(match section.number {
                13 => " (incluir tabela de riscos)",
                _ => " (incluir tabela de custos)",
            });
        }
        out.push('\n');
        if with_subsections {
            for sub in section.subsections {
                out.push_str("   ");
                out.push_str(sub);
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_is_numbered_one_to_fourteen() {
        let numbers: Vec<u8> = SECTIONS.iter().map(|s| s.number).collect();
        assert_eq!(numbers, (1..=14).collect::<Vec<u8>>());
    }

    #[test]
    fn test_cost_and_risk_sections_require_tables() {
        let with_tables: Vec<u8> = SECTIONS
            .iter()
            .filter(|s| s.requires_table)
            .map(|s| s.number)
            .collect();
        assert_eq!(with_tables, vec![4, 6, 13]);
    }

    #[test]
    fn test_outline_splits_halves() {
        let first = outline(1..=7, false);
        let second = outline(8..=14, false);
        assert!(first.starts_with("1. INTRODUÇÃO\n"));
        assert!(first.contains("7. DESCRIÇÃO DA SOLUÇÃO COMO UM TODO"));
        assert!(!first.contains("8. JUSTIFICATIVA"));
        assert!(second.contains("13. ANÁLISE DE RISCOS (incluir tabela de riscos)"));
        assert!(!second.contains("2.1"));
    }
}
