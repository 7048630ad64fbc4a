//! Deterministic 14-section document used whenever generated text fails the
//! completeness gate. Answers are interpolated into sections 1, 2, 3, 4, 5
//! and 8; everything else is fixed text, so the body depends on the answers
//! alone and the framed document varies only by its date line.

use chrono::NaiveDate;

use crate::etp::Answers;

use super::strategy::frame_document;

const DEFAULT_OBJECT: &str = "a solução demandada pela unidade requisitante";

pub const COST_TABLE: &str = "\
| Item | Quantidade | Unidade | Valor Unitário | Valor Total |
|------|------------|---------|----------------|-------------|
| Objeto da contratação | 1 | Conjunto | R$ 100.000,00 | R$ 100.000,00 |
| **TOTAL GERAL** | | | | **R$ 100.000,00** |";

pub const RISK_TABLE: &str = "\
| Risco | Probabilidade | Impacto | Mitigação |
|-------|---------------|---------|-----------|
| Indisponibilidade de fornecedores | Baixa | Médio | Ampla pesquisa de mercado |
| Variação de preços | Média | Alto | Cláusulas de reajuste |
| Problemas técnicos | Baixa | Alto | Especificações detalhadas |";

/// Fallback body: the 14 sections without header or footer.
pub fn fallback_body(answers: &Answers) -> String {
    let object = answers.get_or(1, DEFAULT_OBJECT);

    let pca = match answers.as_bool(2) {
        Some(true) => format!(
            "A contratação está devidamente prevista no Plano de Contratações Anual (PCA) \
             do órgão, conforme informado pela unidade requisitante: {}.",
            answers.get_or(2, "Sim")
        ),
        Some(false) => format!(
            "A contratação ainda não consta do Plano de Contratações Anual (PCA), devendo \
             ser providenciada sua inclusão ou justificativa na forma do art. 12, inciso VII, \
             da Lei nº 14.133/2021. Informação prestada: {}.",
            answers.get_or(2, "Não")
        ),
        None => "A previsão da contratação no Plano de Contratações Anual (PCA) deverá ser \
                 confirmada pela unidade requisitante antes da fase externa."
            .to_string(),
    };

    let norms = answers.get_or(
        3,
        "A contratação observará integralmente a Lei nº 14.133/2021 e os regulamentos \
         aplicáveis à matéria.",
    );

    let estimate = answers.get_or(
        4,
        "A estimativa de quantidades e valores será consolidada a partir de pesquisa de \
         preços realizada junto a fornecedores do ramo.",
    );

    let installments = match answers.as_bool(5) {
        Some(true) => format!(
            "A contratação será parcelada, por ser técnica e economicamente viável a divisão \
             do objeto, ampliando a competitividade sem perda de economia de escala, nos \
             termos do art. 40, inciso V, alínea \"b\", da Lei nº 14.133/2021. Informação \
             prestada: {}.",
            answers.get_or(5, "Sim")
        ),
        Some(false) => format!(
            "A contratação não será parcelada, a fim de preservar a unidade técnica e \
             gerencial do objeto e o aproveitamento da economia de escala, nos termos do \
             art. 40, § 3º, da Lei nº 14.133/2021. Informação prestada: {}.",
            answers.get_or(5, "Não")
        ),
        None => "A decisão quanto ao parcelamento será consolidada no termo de referência, \
                 considerando a viabilidade técnica e econômica da divisão do objeto."
            .to_string(),
    };

    format!(
        "1. INTRODUÇÃO

O presente Estudo Técnico Preliminar (ETP) foi elaborado em conformidade com o art. 18, inciso I, da Lei nº 14.133/2021 e tem por objeto {object}.

Este documento caracteriza a primeira etapa da fase de planejamento e demonstra a viabilidade técnica e econômica da contratação pretendida, subsidiando a elaboração do termo de referência.

A metodologia adotada baseou-se na análise das necessidades da Administração, em pesquisa de mercado e na consulta à legislação pertinente, em observância aos princípios da legalidade, impessoalidade, moralidade, publicidade e eficiência.

2. OBJETO DO ESTUDO E ESPECIFICAÇÕES GERAIS

2.1 Localização da execução do objeto contratual

A execução do objeto ocorrerá nas dependências da Administração, conforme as condições a serem detalhadas no termo de referência.

2.2 Natureza e finalidade do objeto

O objeto enquadra-se como bem ou serviço comum, passível de licitação na modalidade pregão eletrônico, e tem por finalidade atender à necessidade descrita a seguir.

2.3 Classificação quanto ao sigilo

As informações deste estudo são de natureza pública, não havendo classificação de sigilo nos termos da Lei nº 12.527/2011.

2.4 Descrição da necessidade da contratação

{object}

2.5 Demonstração da previsão no plano de contratações anual

{pca}

3. DESCRIÇÃO DOS REQUISITOS DA CONTRATAÇÃO

3.1 Requisitos técnicos

Os requisitos técnicos foram definidos a partir das necessidades operacionais identificadas, observando padrões de qualidade, desempenho e compatibilidade com a infraestrutura existente.

3.2 Requisitos de sustentabilidade

Em atendimento ao art. 11, inciso IV, da Lei nº 14.133/2021, serão exigidos critérios de sustentabilidade ambiental, social e econômica compatíveis com o objeto.

3.3 Requisitos normativos e legais

{norms}

4. ESTIMATIVA DAS QUANTIDADES E VALORES

{estimate}

A estimativa considera os custos diretos e indiretos necessários à execução completa do objeto e será validada por pesquisa de preços nos termos do art. 23 da Lei nº 14.133/2021.

{COST_TABLE}

5. LEVANTAMENTO DE MERCADO E JUSTIFICATIVA DA ESCOLHA DA SOLUÇÃO

5.1 Justificativa para a escolha da solução

A solução escolhida para {object} apresenta a melhor relação custo-benefício entre as alternativas avaliadas, considerando os requisitos técnicos e funcionais estabelecidos.

5.2 Pesquisa de mercado

O levantamento de mercado envolveu consulta a fornecedores, painéis de preços públicos e contratações similares de outros órgãos, assegurando a representatividade dos valores.

6. ESTIMATIVA DO VALOR DA CONTRATAÇÃO

O valor estimado da contratação foi obtido a partir da consolidação das quantidades e preços unitários apresentados na seção 4, observados os princípios da economicidade e da eficiência.

A estimativa será atualizada na fase de elaboração do termo de referência, caso haja variação relevante dos preços de mercado.

7. DESCRIÇÃO DA SOLUÇÃO COMO UM TODO

A solução proposta contempla o fornecimento do objeto, sua entrega, instalação quando aplicável, garantia e suporte, de modo a atender integralmente à necessidade identificada.

A implantação será acompanhada por fiscal designado, com critérios objetivos de recebimento provisório e definitivo.

8. JUSTIFICATIVA PARA O PARCELAMENTO OU NÃO DA CONTRATAÇÃO

{installments}

9. DEMONSTRATIVO DOS RESULTADOS PRETENDIDOS

Espera-se, com a contratação, maior eficiência operacional, melhoria da qualidade dos serviços prestados e melhor aproveitamento dos recursos públicos.

Os resultados serão acompanhados por indicadores definidos no termo de referência e aferidos durante a execução contratual.

10. PROVIDÊNCIAS ADOTADAS ANTERIORMENTE PELA ADMINISTRAÇÃO

A Administração realizou o levantamento das necessidades junto às áreas demandantes, consulta preliminar ao mercado e verificação da disponibilidade orçamentária.

Não foram identificadas providências pendentes que impeçam o prosseguimento da contratação.

11. CONTRATAÇÕES CORRELATAS OU INTERDEPENDENTES

Não foram identificadas contratações correlatas ou interdependentes que impactem a execução do objeto, não havendo sobreposição com contratos vigentes.

12. AVALIAÇÃO DOS IMPACTOS AMBIENTAIS

A contratação observará critérios de sustentabilidade, priorizando soluções com menor consumo de recursos naturais e destinação adequada de resíduos, conforme a legislação ambiental vigente.

13. ANÁLISE DE RISCOS

Foram identificados os principais riscos associados à contratação, com as respectivas medidas de mitigação, conforme a matriz a seguir.

{RISK_TABLE}

14. CONCLUSÃO E POSICIONAMENTO FINAL

Com base nos estudos realizados, conclui-se pela viabilidade técnica e econômica da contratação de {object}, recomendando-se o prosseguimento com a elaboração do termo de referência.

A contratação atende aos requisitos legais e técnicos aplicáveis e aos princípios que regem a Administração Pública, em especial os da Lei nº 14.133/2021."
    )
}

/// Fallback body framed with the standard header and footer for `date`.
pub fn fallback_document(answers: &Answers, date: NaiveDate) -> String {
    frame_document(&fallback_body(answers), date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::completeness::{assess, count_section_markers};
    use crate::generation::sections::SECTIONS;

    fn spec_answers() -> Answers {
        let mut a = Answers::default();
        a.set(1, "Compra de computadores");
        a.set(2, "Sim");
        a.set(3, "Lei 14.133/21");
        a.set(4, "R$50.000");
        a.set(5, "Não");
        a
    }

    #[test]
    fn test_fallback_contains_every_section_heading() {
        let body = fallback_body(&spec_answers());
        for section in &SECTIONS {
            assert!(
                body.contains(&section.heading()),
                "missing heading: {}",
                section.heading()
            );
        }
        assert_eq!(count_section_markers(&body), 14);
        assert!(assess(&body).is_acceptable());
    }

    #[test]
    fn test_fallback_interpolates_answers() {
        let body = fallback_body(&spec_answers());
        assert!(body.contains("Compra de computadores"));
        assert!(body.contains("Lei 14.133/21"));
        assert!(body.contains("R$50.000"));
        assert!(body.contains("não será parcelada"));
        assert!(body.contains("devidamente prevista no Plano de Contratações Anual"));
    }

    #[test]
    fn test_fallback_without_answers_still_has_fourteen_sections() {
        let body = fallback_body(&Answers::default());
        assert_eq!(count_section_markers(&body), 14);
        assert!(body.contains(DEFAULT_OBJECT));
    }

    #[test]
    fn test_fallback_is_identical_for_identical_answers_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let a = fallback_document(&spec_answers(), date);
        let b = fallback_document(&spec_answers(), date);
        assert_eq!(a, b);
        assert!(a.contains("15/03/2024"));
    }

    #[test]
    fn test_fallback_differs_only_by_date_line() {
        let a = fallback_document(&spec_answers(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        let b = fallback_document(&spec_answers(), NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        let differing: Vec<(&str, &str)> = a
            .lines()
            .zip(b.lines())
            .filter(|(x, y)| x != y)
            .collect();
        assert_eq!(differing.len(), 1);
        assert!(differing[0].0.starts_with("Data: "));
    }

    #[test]
    fn test_fallback_tables_sit_in_cost_and_risk_sections() {
        let body = fallback_body(&spec_answers());
        let cost_at = body.find("| Item | Quantidade").unwrap();
        let risk_at = body.find("| Risco | Probabilidade").unwrap();
        assert!(body.find("4. ESTIMATIVA").unwrap() < cost_at);
        assert!(cost_at < body.find("5. LEVANTAMENTO").unwrap());
        assert!(body.find("13. ANÁLISE DE RISCOS").unwrap() < risk_at);
        assert!(risk_at < body.find("14. CONCLUSÃO").unwrap());
    }
}
