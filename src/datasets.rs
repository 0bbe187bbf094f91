use crate::cli::DatasetName;
use crate::model::{Coercion, ColumnSpec, DatasetSpec, PartitionKey, WindowPolicy};

const ADVISOR_PREFIX: &str = "A";

const fn col(source: &'static str, column: &'static str, coercion: Coercion) -> ColumnSpec {
    ColumnSpec {
        source,
        column,
        coercion,
    }
}

const ORDENS_RF_COLUMNS: &[ColumnSpec] = &[
    col("Data", "data_ordem", Coercion::NullableDate),
    col("Cód. assessor", "codigo_assessor", Coercion::Text),
    col("Cód. conta", "codigo_cliente", Coercion::NullableInteger),
    col("Tipo ativo", "tipo_ativo", Coercion::Text),
    col("Ticker", "ticker", Coercion::Text),
    col("Nome papel", "nome_papel", Coercion::Text),
    col("Indexador", "indexador", Coercion::Text),
    col("Vencimento", "data_vencimento", Coercion::NullableDate),
    col("Tipo operação", "tipo_operacao", Coercion::Text),
    col("Quantidade", "quantidade", Coercion::NullableInteger),
    col("Volume", "volume", Coercion::CurrencyDecimal),
    col("Receita a dividir", "receita_a_dividir", Coercion::CurrencyDecimal),
    col("PU Cliente", "pu_cliente", Coercion::Number),
    col("PU TMR", "pu_tmr", Coercion::Number),
    col("Taxa Cliente", "taxa_cliente", Coercion::Number),
    col("Taxa TMR", "taxa_tmr", Coercion::Number),
];

const POSITIVADOR_COLUMNS: &[ColumnSpec] = &[
    col(
        "Assessor",
        "codigo_assessor",
        Coercion::PrefixedIdentifier(ADVISOR_PREFIX),
    ),
    col("Cliente", "codigo_cliente", Coercion::NullableInteger),
    col("Profissão", "profissao", Coercion::Text),
    col("Sexo", "sexo", Coercion::Text),
    col("Segmento", "segmento", Coercion::Text),
    col("Data de Cadastro", "data_cadastro", Coercion::SerialDate),
    col("Fez Segundo Aporte?", "fez_segundo_aporte", Coercion::Text),
    col("Data de Nascimento", "data_nascimento", Coercion::SerialDate),
    col("Status", "status", Coercion::Text),
    col("Ativou em M?", "ativou_em_m", Coercion::Text),
    col("Evadiu em M?", "evadiu_em_m", Coercion::Text),
    col("Operou Bolsa?", "operou_bolsa", Coercion::Text),
    col("Operou Fundo?", "operou_fundo", Coercion::Text),
    col("Operou Renda Fixa?", "operou_renda_fixa", Coercion::Text),
    col(
        "Aplicação Financeira Declarada Ajustada",
        "aplicacao_financeira_declarada_ajustada",
        Coercion::Number,
    ),
    col("Receita no Mês", "receita_no_mes", Coercion::Number),
    col("Receita Bovespa", "receita_bovespa", Coercion::Number),
    col("Receita Futuros", "receita_futuros", Coercion::Number),
    col("Receita RF Bancários", "receita_rf_bancarios", Coercion::Number),
    col("Receita RF Privados", "receita_rf_privados", Coercion::Number),
    col("Receita RF Públicos", "receita_rf_publicos", Coercion::Number),
    col("Captação Bruta em M", "captacao_bruta_em_m", Coercion::Number),
    col("Resgate em M", "resgate_em_m", Coercion::Number),
    col("Captação Líquida em M", "captacao_liquida_em_m", Coercion::Number),
    col("Captação TED", "captacao_ted", Coercion::Number),
    col("Captação ST", "captacao_st", Coercion::Number),
    col("Captação OTA", "captacao_ota", Coercion::Number),
    col("Captação RF", "captacao_rf", Coercion::Number),
    col("Captação TD", "captacao_td", Coercion::Number),
    col("Captação PREV", "captacao_prev", Coercion::Number),
    col("Net em M 1", "net_em_m_1", Coercion::Number),
    col("Net Em M", "net_em_m", Coercion::Number),
    col("Net Renda Fixa", "net_renda_fixa", Coercion::Number),
    col(
        "Net Fundos Imobiliários",
        "net_fundos_imobiliarios",
        Coercion::Number,
    ),
    col("Net Renda Variável", "net_renda_variavel", Coercion::Number),
    col("Net Fundos", "net_fundos", Coercion::Number),
    col("Net Financeiro", "net_financeiro", Coercion::Number),
    col("Net Previdência", "net_previdencia", Coercion::Number),
    col("Net Outros", "net_outros", Coercion::Number),
    col("Receita Aluguel", "receita_aluguel", Coercion::Number),
    col(
        "Receita Complemento Pacote Corretagem",
        "receita_complemento_pacote_corretagem",
        Coercion::Number,
    ),
    col("Tipo Pessoa", "tipo_pessoa", Coercion::Text),
    col("Data Posição", "data_posicao", Coercion::SerialDate),
    col("Data Atualização", "data_atualizacao", Coercion::SerialDate),
];

const SALDO_COLUMNS: &[ColumnSpec] = &[
    col("Conta", "codigo_cliente", Coercion::NullableInteger),
    col("Cliente", "nome_cliente", Coercion::Text),
    col(
        "Assessor",
        "codigo_assessor",
        Coercion::PrefixedIdentifier(ADVISOR_PREFIX),
    ),
    col("D0", "d0", Coercion::Number),
    col("D+1", "d1", Coercion::Number),
    col("D+2", "d2", Coercion::Number),
    col("D+3", "d3", Coercion::Number),
    col("Total", "saldo_total", Coercion::Number),
];

pub static ORDENS_RF: DatasetSpec = DatasetSpec {
    name: "ordens_rf",
    table: "tb_ordens_rf",
    file_prefix: "ordens_rf",
    file_extension: "xlsx",
    date_segment: 2,
    columns: ORDENS_RF_COLUMNS,
    partition_key: PartitionKey::SourceColumn("data_ordem"),
    window_policy: WindowPolicy::CurrentMonthAnchored,
    snapshot_guard: false,
};

pub static POSITIVADOR: DatasetSpec = DatasetSpec {
    name: "positivador",
    table: "tb_positivador",
    file_prefix: "positivador",
    file_extension: "xlsx",
    date_segment: 1,
    columns: POSITIVADOR_COLUMNS,
    partition_key: PartitionKey::SourceColumn("data_posicao"),
    window_policy: WindowPolicy::CurrentMonthAnchored,
    snapshot_guard: true,
};

pub static SALDO: DatasetSpec = DatasetSpec {
    name: "saldo",
    table: "tb_saldo",
    file_prefix: "saldo",
    file_extension: "xlsx",
    date_segment: 1,
    columns: SALDO_COLUMNS,
    partition_key: PartitionKey::FileReportingDate("data_saldo"),
    window_policy: WindowPolicy::SnapshotAnchored,
    snapshot_guard: true,
};

pub fn all() -> [&'static DatasetSpec; 3] {
    [&ORDENS_RF, &POSITIVADOR, &SALDO]
}

pub fn by_name(name: DatasetName) -> &'static DatasetSpec {
    match name {
        DatasetName::OrdensRf => &ORDENS_RF,
        DatasetName::Positivador => &POSITIVADOR,
        DatasetName::Saldo => &SALDO,
    }
}

/// Datasets in their canonical order; an empty selection means all of them.
pub fn select(names: &[DatasetName]) -> Vec<&'static DatasetSpec> {
    all()
        .into_iter()
        .filter(|spec| names.is_empty() || names.iter().any(|name| by_name(*name).name == spec.name))
        .collect()
}

pub fn date_column_for_table(table: &str) -> Option<&'static str> {
    all()
        .into_iter()
        .find(|spec| spec.table == table)
        .map(DatasetSpec::partition_column)
}
