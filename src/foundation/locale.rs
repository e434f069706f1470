//! Fixed pt-BR strings and formatting.

use chrono::NaiveDate;

/// Token in the introduction text replaced by the client's name.
pub const CLIENT_NAME_PLACEHOLDER: &str = "[NOME_CLIENTE]";

pub const COVER_TITLE: &str = "RELATÓRIO TERAPÊUTICO";
pub const COVER_SUBTITLE: &str = "ATENDIMENTO HOLÍSTICO";
pub const COVER_TAGLINE: &str = "SISTEMA ARCTURIANO DE CURA MULTIDIMENSIONAL";
pub const COVER_ISSUED_BY: &str = "Relatório emitido por";

pub const LABEL_THERAPIST: &str = "Terapeuta";
pub const LABEL_CLIENT: &str = "Cliente";
pub const LABEL_DATE: &str = "Data";
pub const LABEL_TIME: &str = "Horário";

pub const TIME_NOT_INFORMED: &str = "Não informado";

pub const INTRODUCTION_TITLE: &str = "INTRODUÇÃO";
pub const CLOSING_TITLE: &str = "CONSIDERAÇÕES FINAIS";
pub const IMAGE_UNAVAILABLE: &str = "[ Imagem não disponível ]";
pub const THERAPIST_ROLE: &str = "Terapeuta Responsável";

pub const MISSING_FIELDS_NOTICE: &str = "Por favor, preencha todos os campos obrigatórios.";
pub const NO_ITEMS_NOTICE: &str = "Por favor, selecione pelo menos uma frequência.";

const CLOSING_BOILERPLATE: &str = "Cada frequência foi selecionada com base nas necessidades \
específicas identificadas durante a avaliação, visando promover o equilíbrio e bem-estar.

Para dúvidas ou esclarecimentos adicionais, entre em contato com o terapeuta responsável.";

/// `dd/mm/aaaa`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn issued_on_line(date: NaiveDate) -> String {
    format!("Relatório emitido em: {}", format_date(date))
}

/// `"<label>: <value>"`, the fallback cover's line format.
pub fn label_line(label: &str, value: &str) -> String {
    format!("{label}: {value}")
}

/// Closing page body: summary sentence, then the fixed paragraphs.
pub fn closing_text(item_count: usize, client_name: &str) -> String {
    format!(
        "Este relatório apresenta as {item_count} frequências utilizadas na sessão terapêutica \
de {client_name}.\n\n{CLOSING_BOILERPLATE}"
    )
}

/// Replace every occurrence of [`CLIENT_NAME_PLACEHOLDER`]; matching is case-sensitive.
pub fn fill_client_name(text: &str, client_name: &str) -> String {
    text.replace(CLIENT_NAME_PLACEHOLDER, client_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_is_day_month_year() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(format_date(d), "01/05/2024");
        assert_eq!(issued_on_line(d), "Relatório emitido em: 01/05/2024");
    }

    #[test]
    fn placeholder_replacement_is_global_and_case_sensitive() {
        assert_eq!(
            fill_client_name("Olá [NOME_CLIENTE], bem-vindo", "Ana"),
            "Olá Ana, bem-vindo"
        );
        assert_eq!(
            fill_client_name("[NOME_CLIENTE] e [NOME_CLIENTE]", "Ana"),
            "Ana e Ana"
        );
        assert_eq!(
            fill_client_name("[nome_cliente] [NOME]", "Ana"),
            "[nome_cliente] [NOME]"
        );
    }

    #[test]
    fn closing_text_names_count_and_client() {
        let text = closing_text(3, "Ana");
        assert!(text.starts_with(
            "Este relatório apresenta as 3 frequências utilizadas na sessão terapêutica de Ana."
        ));
        assert!(text.ends_with("entre em contato com o terapeuta responsável."));
    }
}
