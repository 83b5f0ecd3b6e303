//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Konferenz-Einstellungen (Rednerliste, Redezeit)
    pub konferenz: KonferenzEinstellungen,
    /// Relay-Einstellungen (Qualitaets-Heuristik)
    pub relay: RelayEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Health, Status)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Clients
    pub max_clients: u32,
    /// Shared Secret fuer nachtraegliche Admin-Authentifizierung
    /// (None = nur die Bootstrap-Regel vergibt Admin-Rollen)
    pub admin_passwort: Option<String>,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Podium Server".into(),
            max_clients: 512,
            admin_passwort: None,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer die TCP-Verbindung (Control-Protokoll)
    pub bind_adresse: String,
    /// Port fuer die TCP-Verbindung
    pub tcp_port: u16,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 9640,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
        }
    }
}

/// Konferenz-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KonferenzEinstellungen {
    /// Maximale Laenge der Rednerliste
    pub max_warteschlange: usize,
    /// Maximale Redezeit pro Sprechphase in Sekunden
    pub redezeit_limit_sek: u64,
    /// Gewicht neuer Messwerte im Latenz-Mittelwert (0..1)
    pub glaettungs_gewicht: f64,
}

impl Default for KonferenzEinstellungen {
    fn default() -> Self {
        Self {
            max_warteschlange: 50,
            redezeit_limit_sek: 180,
            glaettungs_gewicht: 0.2,
        }
    }
}

/// Relay-Einstellungen (Qualitaets-Heuristik)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEinstellungen {
    /// Erwartete Payload-Groesse eines Segments in Bytes
    pub erwartete_segment_bytes: u64,
    /// Latenz-Obergrenze fuer `excellent` in Millisekunden
    pub latenz_exzellent_ms: f64,
    /// Latenz-Obergrenze fuer `good` in Millisekunden
    pub latenz_gut_ms: f64,
    /// Untere Grenze des Groessen-Verhaeltnisses fuer `excellent`
    pub groesse_exzellent_min: f64,
    /// Obere Grenze des Groessen-Verhaeltnisses fuer `excellent`
    pub groesse_exzellent_max: f64,
    /// Untere Grenze des Groessen-Verhaeltnisses fuer `good`
    pub groesse_gut_min: f64,
    /// Alle wieviel Segmente eine Durchsatz-Zeile geloggt wird
    pub perf_log_intervall: u64,
}

impl Default for RelayEinstellungen {
    fn default() -> Self {
        Self {
            erwartete_segment_bytes: 8000,
            latenz_exzellent_ms: 200.0,
            latenz_gut_ms: 400.0,
            groesse_exzellent_min: 0.8,
            groesse_exzellent_max: 1.2,
            groesse_gut_min: 0.6,
            perf_log_intervall: 100,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Health + Status)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Health und Status (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port)
    }
}
