use std::time::Instant;

use sqlx::postgres::{PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::{Row, Transaction};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::DataAccessError;
use crate::models::{ContractSummary, EvaluationDetailRow};
use crate::window::DateWindow;

const SUMMARY_SQL: &str = r#"
WITH assignments AS (
    SELECT DISTINCT pec."ContratoId" AS contract_id,
                    pec."ColaboradorId" AS collaborator_id
    FROM   "ProjetoEmpresaColaboradores" pec
    WHERE  pec."Ativo"
),
scores AS (
    SELECT   ac."ColaboradorId" AS collaborator_id,
             AVG((ac."Tecnico" + ac."Comunicacao" + ac."Comprometimento")::DOUBLE PRECISION / 3.0)
                 AS average_score
    FROM     "AvaliacaoColaboradores" ac
    WHERE    ac."Periodo" BETWEEN $1 AND $2
    GROUP BY ac."ColaboradorId"
)
SELECT   c."Id"                                        AS contract_id,
         e."Nome"                                      AS client_name,
         c."Objeto"                                    AS project_label,
         COUNT(DISTINCT a.collaborator_id)::BIGINT     AS collaborator_count,
         MIN(s.average_score)                          AS worst_average_score,
         AVG(s.average_score)                          AS mean_average_score,
         COALESCE(SUM(CASE WHEN s.average_score IS NOT NULL
                            AND s.average_score < $3 THEN 1 ELSE 0 END), 0)::BIGINT
                                                       AS bad_collaborator_count
FROM     "Contratos" c
JOIN     "Empresas" e    ON e."Id" = c."EmpresaId"
JOIN     assignments a   ON a.contract_id = c."Id"
LEFT JOIN scores s       ON s.collaborator_id = a.collaborator_id
WHERE    c."IsAtivo"
GROUP BY c."Id", e."Nome", c."Objeto"
ORDER BY c."Id"
"#;

const DETAILS_SQL: &str = r#"
SELECT   col."NomeCompleto"                            AS collaborator_name,
         ac."Periodo"                                  AS period,
         (ac."Tecnico" + ac."Comunicacao" + ac."Comprometimento")::DOUBLE PRECISION / 3.0
                                                       AS score,
         ac."Tecnico"                                  AS technical,
         ac."Comunicacao"                              AS communication,
         ac."Comprometimento"                          AS commitment,
         ac."Descricao"                                AS comment
FROM     "AvaliacaoColaboradores" ac
JOIN     "Colaboradores" col ON col."Id" = ac."ColaboradorId"
WHERE    ac."ContratoId" = $1
  AND    ac."Periodo" BETWEEN $2 AND $3
  AND    EXISTS (
             SELECT 1
             FROM   "ProjetoEmpresaColaboradores" pec
             WHERE  pec."ContratoId" = $1
               AND  pec."ColaboradorId" = ac."ColaboradorId"
               AND  pec."Ativo"
         )
ORDER BY col."NomeCompleto", ac."Periodo" DESC
"#;

/// Pooled handle on the evaluation store.
///
/// Every query checks a connection out, runs in its own read-only
/// transaction and hands the connection back when the transaction ends.
#[derive(Debug, Clone)]
pub struct DataStoreClient {
    pool: PgPool,
}

impl DataStoreClient {
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let options = config.connect_options()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .test_before_acquire(true)
            .connect_with(options)
            .await
            .map_err(DataAccessError::Connect)?;

        info!(
            max_connections = config.max_connections,
            "connected to evaluation store"
        );
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn read_only(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

/// Runs the summary and drill-down queries for a date window.
#[derive(Debug, Clone)]
pub struct EvaluationAggregator {
    client: DataStoreClient,
}

impl EvaluationAggregator {
    pub fn new(client: DataStoreClient) -> Self {
        Self { client }
    }

    pub async fn fetch_summary(
        &self,
        window: DateWindow,
        threshold: f64,
    ) -> Result<Vec<ContractSummary>, DataAccessError> {
        const OPERATION: &str = "contract summary";
        let started = Instant::now();

        let mut tx = self
            .client
            .read_only()
            .await
            .map_err(DataAccessError::query(OPERATION))?;
        let rows = sqlx::query(SUMMARY_SQL)
            .bind(window.start)
            .bind(window.end)
            .bind(threshold)
            .fetch_all(&mut *tx)
            .await
            .map_err(DataAccessError::query(OPERATION))?;
        tx.commit().await.map_err(DataAccessError::query(OPERATION))?;

        let summaries = rows
            .iter()
            .map(summary_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(DataAccessError::query(OPERATION))?;

        debug!(
            start = %window.start,
            end = %window.end,
            threshold,
            contracts = summaries.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched contract summary"
        );
        Ok(summaries)
    }

    pub async fn fetch_details(
        &self,
        contract_id: i32,
        window: DateWindow,
    ) -> Result<Vec<EvaluationDetailRow>, DataAccessError> {
        const OPERATION: &str = "evaluation details";
        let started = Instant::now();

        let mut tx = self
            .client
            .read_only()
            .await
            .map_err(DataAccessError::query(OPERATION))?;
        let rows = sqlx::query(DETAILS_SQL)
            .bind(contract_id)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&mut *tx)
            .await
            .map_err(DataAccessError::query(OPERATION))?;
        tx.commit().await.map_err(DataAccessError::query(OPERATION))?;

        let details = rows
            .iter()
            .map(detail_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(DataAccessError::query(OPERATION))?;
        debug_assert!(details.iter().all(|detail| window.contains(detail.period)));

        debug!(
            contract_id,
            start = %window.start,
            end = %window.end,
            evaluations = details.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched evaluation details"
        );
        Ok(details)
    }
}

fn summary_from_row(row: &PgRow) -> Result<ContractSummary, sqlx::Error> {
    Ok(ContractSummary {
        contract_id: row.try_get("contract_id")?,
        client_name: row.try_get("client_name")?,
        project_label: row.try_get("project_label")?,
        collaborator_count: row.try_get("collaborator_count")?,
        worst_average_score: row.try_get("worst_average_score")?,
        mean_average_score: row.try_get("mean_average_score")?,
        bad_collaborator_count: row.try_get("bad_collaborator_count")?,
    })
}

fn detail_from_row(row: &PgRow) -> Result<EvaluationDetailRow, sqlx::Error> {
    Ok(EvaluationDetailRow {
        collaborator_name: row.try_get("collaborator_name")?,
        period: row.try_get("period")?,
        score: row.try_get("score")?,
        technical: row.try_get("technical")?,
        communication: row.try_get("communication")?,
        commitment: row.try_get("commitment")?,
        comment: row.try_get("comment")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FIXTURE: &str = include_str!("../fixtures/evaluations.sql");

    fn march_2024() -> DateWindow {
        DateWindow::for_month(NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date"))
    }

    async fn seeded(pool: PgPool) -> anyhow::Result<EvaluationAggregator> {
        sqlx::raw_sql(FIXTURE).execute(&pool).await?;
        Ok(EvaluationAggregator::new(DataStoreClient::from_pool(pool)))
    }

    fn by_id(summaries: &[ContractSummary], contract_id: i32) -> &ContractSummary {
        summaries
            .iter()
            .find(|summary| summary.contract_id == contract_id)
            .expect("contract present in summary")
    }

    fn close(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|value| (value - expected).abs() < 1e-9)
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn summary_aggregates_per_collaborator_average(pool: PgPool) -> anyhow::Result<()> {
        let aggregator = seeded(pool).await?;
        let summaries = aggregator.fetch_summary(march_2024(), 3.0).await?;

        // inactive contract 4 and assignment-less contract 5 never show up
        let ids: Vec<i32> = summaries.iter().map(|s| s.contract_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let acme = by_id(&summaries, 1);
        assert_eq!(acme.collaborator_count, 3);
        assert!(close(acme.worst_average_score, 2.0));
        assert!(close(acme.mean_average_score, 3.0));
        assert_eq!(acme.bad_collaborator_count, 1);

        let globex = by_id(&summaries, 2);
        assert_eq!(globex.collaborator_count, 1);
        assert!(close(globex.worst_average_score, 4.0));
        assert_eq!(globex.bad_collaborator_count, 0);
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn summary_keeps_unevaluated_contracts(pool: PgPool) -> anyhow::Result<()> {
        let aggregator = seeded(pool).await?;
        let summaries = aggregator.fetch_summary(march_2024(), 3.0).await?;

        let initech = by_id(&summaries, 3);
        assert_eq!(initech.collaborator_count, 1);
        assert_eq!(initech.worst_average_score, None);
        assert_eq!(initech.mean_average_score, None);
        assert_eq!(initech.bad_collaborator_count, 0);
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn details_stay_inside_contract_and_window(pool: PgPool) -> anyhow::Result<()> {
        let aggregator = seeded(pool).await?;
        let window = march_2024();
        let details = aggregator.fetch_details(1, window).await?;

        let names: Vec<&str> = details.iter().map(|d| d.collaborator_name.as_str()).collect();
        assert_eq!(names, vec!["Ana Souza", "Ana Souza", "Bruno Lima"]);
        assert!(details.iter().all(|d| window.contains(d.period)));
        assert!(details[0].period > details[1].period);
        assert_eq!(details[2].comment, None);
        assert!((details[2].score - 2.0).abs() < 1e-9);
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn details_for_contract_without_evaluations_are_empty(
        pool: PgPool,
    ) -> anyhow::Result<()> {
        let aggregator = seeded(pool).await?;
        assert!(aggregator.fetch_details(3, march_2024()).await?.is_empty());
        assert!(aggregator.fetch_details(999, march_2024()).await?.is_empty());
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn repeated_queries_return_identical_results(pool: PgPool) -> anyhow::Result<()> {
        let aggregator = seeded(pool).await?;
        let window = march_2024();

        let first = aggregator.fetch_summary(window, 3.0).await?;
        let second = aggregator.fetch_summary(window, 3.0).await?;
        assert_eq!(first, second);

        let first = aggregator.fetch_details(1, window).await?;
        let second = aggregator.fetch_details(1, window).await?;
        assert_eq!(first, second);
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn missing_schema_surfaces_as_data_access_error(pool: PgPool) -> anyhow::Result<()> {
        sqlx::query(r#"DROP TABLE "AvaliacaoColaboradores""#)
            .execute(&pool)
            .await?;
        let aggregator = EvaluationAggregator::new(DataStoreClient::from_pool(pool));

        let err = aggregator
            .fetch_summary(march_2024(), 3.0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DataAccessError::Query {
                operation: "contract summary",
                ..
            }
        ));
        Ok(())
    }
}
