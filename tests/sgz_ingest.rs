use std::io::Cursor;

use sgz_ingest::config::IngestSettings;
use sgz_ingest::domain::TechnicalArea;
use sgz_ingest::ingest::progress::NullNotifier;
use sgz_ingest::ingest::{IngestError, IngestionService};
use sgz_ingest::store::{MemoryStore, WorkOrderStore};

const EXPORT: &str = "\
Ordem de Serviço,Status,Serviço,Empresa,Data de Abertura,Data do Status,Distrito,Bairro\n\
OS-1,ABERTA,PODA REMOCAO ARVORES,Alfa Ambiental,01/03/2025,,Grajaú,Parque América\n\
OS-2,CONCLUIDA,SERRALHERIA,Beta Obras,02/03/2025,12/03/2025,Cidade Dutra,Vila Rubi\n\
OS-3,EM ANDAMENTO,LIMPEZA DE TERRENO,,03/03/2025,,Grajaú,Jardim Eliana\n";

fn settings(chunk_size: usize) -> IngestSettings {
    IngestSettings { chunk_size }
}

fn ingest(store: &MemoryStore, csv: &str, chunk_size: usize) -> Result<sgz_ingest::ingest::engine::IngestionReport, IngestError> {
    let service = IngestionService::new(store, &NullNotifier, settings(chunk_size));
    service.ingest_csv(Cursor::new(csv.to_string()), "export.csv".to_string(), None)
}

#[test]
fn ingest_produces_one_record_per_data_row() {
    let store = MemoryStore::new();
    let report = ingest(&store, EXPORT, 50).expect("ingest succeeds");

    assert_eq!(report.qty_processed, 3);
    assert_eq!(report.qty_valid, 3);
    assert!(report.failed_chunks.is_empty());
    assert!(report.metadata_persisted);

    let orders = store.orders().expect("orders listed");
    assert_eq!(orders.len(), 3);
    assert!(orders.iter().all(|order| !order.order_number.is_empty()));
}

#[test]
fn classification_and_derived_fields_survive_ingestion() {
    let store = MemoryStore::new();
    ingest(&store, EXPORT, 50).expect("ingest succeeds");

    let orders = store.orders().expect("orders listed");
    let poda = orders
        .iter()
        .find(|order| order.order_number == "OS-1")
        .expect("OS-1 present");
    assert_eq!(poda.technical_area, Some(TechnicalArea::ParksAndGreenery));
    assert_eq!(poda.status, "ABERTA");

    let serralheria = orders
        .iter()
        .find(|order| order.order_number == "OS-2")
        .expect("OS-2 present");
    assert_eq!(serralheria.technical_area, Some(TechnicalArea::Maintenance));
    // Completed order with a status-change date: 02/03 -> 12/03 is 10 days.
    assert_eq!(serralheria.days_open, 10);

    let limpeza = orders
        .iter()
        .find(|order| order.order_number == "OS-3")
        .expect("OS-3 present");
    assert_eq!(limpeza.technical_area, None);
    assert!(limpeza.company.is_none());
}

#[test]
fn reingesting_the_same_file_is_idempotent() {
    let store = MemoryStore::new();
    ingest(&store, EXPORT, 50).expect("first run");
    let count_after_first = store.order_count().expect("count");

    ingest(&store, EXPORT, 50).expect("second run");
    let count_after_second = store.order_count().expect("count");

    assert_eq!(count_after_first, count_after_second);
    // Each run still opens its own batch row.
    assert_eq!(store.batches().expect("batches").len(), 2);
}

#[test]
fn duplicate_order_numbers_keep_the_last_occurrence() {
    let csv = "\
Ordem de Serviço,Status,Serviço,Data de Abertura,Distrito\n\
OS-1,ABERTA,PODA,01/03/2025,Grajaú\n\
OS-2,ABERTA,CAPINA,01/03/2025,Grajaú\n\
OS-1,CONCLUIDA,PODA,01/03/2025,Grajaú\n";

    let store = MemoryStore::new();
    let report = ingest(&store, csv, 50).expect("ingest succeeds");
    assert_eq!(report.qty_processed, 3);

    let orders = store.orders().expect("orders listed");
    assert_eq!(orders.len(), 2);
    let duplicated = orders
        .iter()
        .find(|order| order.order_number == "OS-1")
        .expect("OS-1 present");
    assert_eq!(duplicated.status, "CONCLUIDA");
}

#[test]
fn duplicate_resolution_holds_across_chunk_boundaries() {
    // Chunk size 1 puts the duplicate in a later chunk; the result must
    // match the single-chunk run.
    let csv = "\
Ordem de Serviço,Status,Serviço,Data de Abertura,Distrito\n\
OS-1,ABERTA,PODA,01/03/2025,Grajaú\n\
OS-1,CONCLUIDA,PODA,01/03/2025,Grajaú\n";

    for chunk_size in [1, 10] {
        let store = MemoryStore::new();
        ingest(&store, csv, chunk_size).expect("ingest succeeds");
        let orders = store.orders().expect("orders listed");
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, "CONCLUIDA");
    }
}

#[test]
fn chunk_size_does_not_change_the_ingested_set() {
    let mut csv = String::from("Ordem de Serviço,Status,Serviço,Data de Abertura,Distrito\n");
    for i in 0..1000 {
        csv.push_str(&format!("OS-{i},ABERTA,PODA,01/03/2025,Grajaú\n"));
    }

    let collect = |chunk_size: usize| {
        let store = MemoryStore::new();
        ingest(&store, &csv, chunk_size).expect("ingest succeeds");
        let mut numbers: Vec<String> = store
            .orders()
            .expect("orders listed")
            .into_iter()
            .map(|order| order.order_number)
            .collect();
        numbers.sort();
        numbers
    };

    assert_eq!(collect(50), collect(500));
}

#[test]
fn alternate_header_spellings_map_to_the_same_fields() {
    let csv = "\
NUMERO OS,SITUACAO,TIPO DE SERVICO,DT ABERTURA,DISTRITO\n\
987654,CONCLUIDA,ROCAGEM,05/02/2025,Pedreira\n";

    let store = MemoryStore::new();
    ingest(&store, csv, 50).expect("ingest succeeds");

    let orders = store.orders().expect("orders listed");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order_number, "987654");
    assert_eq!(orders[0].district, "Pedreira");
    assert_eq!(orders[0].technical_area, Some(TechnicalArea::ParksAndGreenery));
}

#[test]
fn rows_without_order_numbers_get_placeholders() {
    let csv = "\
Ordem de Serviço,Status,Serviço,Data de Abertura,Distrito\n\
,ABERTA,PODA,01/03/2025,Grajaú\n\
,ABERTA,CAPINA,01/03/2025,Grajaú\n";

    let store = MemoryStore::new();
    let report = ingest(&store, csv, 50).expect("ingest succeeds");
    assert_eq!(report.qty_processed, 2);

    let orders = store.orders().expect("orders listed");
    assert_eq!(orders.len(), 2);
    assert!(orders
        .iter()
        .all(|order| order.order_number.starts_with("SEM-OS-")));
}

#[test]
fn missing_required_columns_abort_before_any_state() {
    let csv = "Serviço,Empresa\nPODA,Alfa\n";
    let store = MemoryStore::new();

    let error = ingest(&store, csv, 50).expect_err("validation fails");
    assert!(matches!(error, IngestError::Validation(_)));
    assert!(store.batches().expect("batches").is_empty());
    assert_eq!(store.order_count().expect("count"), 0);
}

#[test]
fn batch_counters_respect_the_processed_invariant() {
    let store = MemoryStore::new();
    ingest(&store, EXPORT, 2).expect("ingest succeeds");

    let batches = store.batches().expect("batches");
    let batch = &batches[0];
    assert!(batch.processed);
    let processed = batch.qty_processed.expect("qty_processed set");
    let valid = batch.qty_valid.expect("qty_valid set");
    assert!(valid <= processed);
}
