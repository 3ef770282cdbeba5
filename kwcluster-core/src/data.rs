use crate::error::Result;
use kwcluster_serp::Serp;
use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};

/// Competitors whose average rank is worse than this are ignored.
const MAX_AVG_RANK: f64 = 20.0;
/// Longest SERP returned per keyword.
const MAX_SERP_LEN: usize = 20;

const SERP_QUERY: &str = "
    WITH serp_competitors AS (
        SELECT
            keyword,
            competitor,
            AVG(avg_rank) AS mean_rank,
            COUNT(*) AS samples
        FROM rankings
        WHERE domain_id = ?1
          AND keyword = ?2
          AND avg_rank IS NOT NULL
          AND avg_rank <= ?3
        GROUP BY keyword, competitor
        ORDER BY mean_rank ASC, samples DESC, competitor ASC
        LIMIT ?4
    )
    SELECT
        keyword,
        ROW_NUMBER() OVER w AS prominence,
        competitor
    FROM serp_competitors
    WINDOW w AS (ORDER BY mean_rank ASC, samples DESC, competitor ASC)
    ORDER BY prominence
";

/// SQLite store of sampled keyword rankings.
///
/// Every operation opens its own connection so fetches can run on separate
/// blocking threads.
#[derive(Debug, Clone)]
pub struct RankingStore {
    path: PathBuf,
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

impl RankingStore {
    /// Remove the database file along with any WAL sidecars.
    pub fn drop(path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = path.as_os_str().to_owned();
            sidecar.push(suffix);
            let sidecar = PathBuf::from(sidecar);
            if sidecar.exists() {
                fs::remove_file(&sidecar)?;
            }
        }
        Ok(())
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Open (creating if needed) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let store = RankingStore {
            path: path.to_path_buf(),
        };
        let conn = store.connect()?;
        Self::init_schema(&conn)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS rankings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                domain_id INTEGER NOT NULL,
                keyword TEXT NOT NULL,
                competitor TEXT NOT NULL,
                avg_rank REAL,
                sampled_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_rankings_domain_keyword
                ON rankings(domain_id, keyword);
            ",
        )?;
        Ok(())
    }

    pub fn insert_ranking(
        &self,
        domain_id: i64,
        keyword: &str,
        competitor: &str,
        avg_rank: Option<f64>,
    ) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO rankings (domain_id, keyword, competitor, avg_rank, sampled_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![domain_id, keyword, competitor, avg_rank, current_timestamp()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Record a ranked list as one sample per member, using its prominence as
    /// the average rank. Returns the number of rows written.
    pub fn import_serp(&self, domain_id: i64, serp: &Serp) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let now = current_timestamp();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO rankings (domain_id, keyword, competitor, avg_rank, sampled_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for member in &serp.members {
                stmt.execute(params![
                    domain_id,
                    serp.keyword,
                    member.competitor,
                    member.prominence as f64,
                    now
                ])?;
            }
        }
        tx.commit()?;
        Ok(serp.members.len())
    }

    /// Distinct keywords sampled for a domain, sorted.
    pub fn fetch_keywords(&self, domain_id: i64) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT keyword FROM rankings WHERE domain_id = ?1 ORDER BY keyword",
        )?;

        let keywords = stmt
            .query_map([domain_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keywords)
    }

    /// Stream the ranked competitors of one keyword, most prominent first.
    ///
    /// `each_row` receives `(keyword, prominence, competitor)`; an error from
    /// it stops the scan and is returned.
    pub fn fetch_serp<F>(&self, domain_id: i64, keyword: &str, mut each_row: F) -> Result<()>
    where
        F: FnMut(String, u32, String) -> Result<()>,
    {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(SERP_QUERY)?;
        let mut rows = stmt.query(params![domain_id, keyword, MAX_AVG_RANK, MAX_SERP_LEN as i64])?;

        while let Some(row) = rows.next()? {
            each_row(row.get(0)?, row.get(1)?, row.get(2)?)?;
        }
        Ok(())
    }

    pub fn count_rankings(&self, domain_id: i64) -> Result<i64> {
        let conn = self.connect()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM rankings WHERE domain_id = ?1",
            [domain_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
