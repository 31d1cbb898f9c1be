//! Fleet schema DDL and demo fixtures.

/// The operational tables. `violation_type` is a text array in the
/// production database; the embedded engine stores it as a
/// comma-separated string, which is enough for planning and tests.
pub const FLEET_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vts_truck_master (
    truck_no TEXT PRIMARY KEY,
    transporter_name TEXT,
    transporter_code TEXT,
    whether_truck_blacklisted TEXT NOT NULL DEFAULT 'N',
    capacity_of_the_truck REAL,
    zone TEXT,
    region TEXT,
    ownership TEXT
);

CREATE TABLE IF NOT EXISTS vts_alert_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tl_number TEXT NOT NULL,
    violation_type TEXT,
    vts_end_datetime TEXT,
    location_name TEXT,
    stoppage_violations_count INTEGER DEFAULT 0,
    route_deviation_count INTEGER DEFAULT 0,
    speed_violation_count INTEGER DEFAULT 0,
    night_driving_count INTEGER DEFAULT 0,
    device_offline_count INTEGER DEFAULT 0,
    device_tamper_count INTEGER DEFAULT 0,
    continuous_driving_count INTEGER DEFAULT 0,
    no_halt_zone_count INTEGER DEFAULT 0,
    main_supply_removal_count INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS vts_ongoing_trips (
    tt_number TEXT NOT NULL,
    driver_name TEXT,
    violation_type TEXT,
    vehicle_location TEXT,
    invoice_number TEXT
);

CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vehicle_number TEXT NOT NULL,
    alert_type TEXT,
    created_at TEXT,
    vehicle_unblocked_date TEXT
);

CREATE TABLE IF NOT EXISTS tt_risk_score (
    tt_number TEXT PRIMARY KEY,
    risk_score REAL
);

CREATE TABLE IF NOT EXISTS transporter_risk_score (
    transporter_name TEXT PRIMARY KEY,
    risk_score REAL
);

CREATE TABLE IF NOT EXISTS completed_trips_risk_score (
    tt_number TEXT NOT NULL,
    risk_score REAL,
    trip_end_date TEXT
);

CREATE TABLE IF NOT EXISTS vts_tripauditmaster (
    tt_number TEXT NOT NULL,
    audit_status TEXT,
    audited_at TEXT
);
";

/// A small consistent data set for demos and integration tests.
pub const FLEET_FIXTURES: &str = "
INSERT OR REPLACE INTO vts_truck_master
    (truck_no, transporter_name, transporter_code, whether_truck_blacklisted,
     capacity_of_the_truck, zone, region, ownership)
VALUES
    ('MH12AB1234', 'Sharma Logistics', 'SL01', 'Y', 18.0, 'WEST', 'Pune', 'OWNED'),
    ('KA05CD9876', 'Deccan Carriers', 'DC02', 'N', 24.0, 'SOUTH', 'Bengaluru', 'LEASED'),
    ('DL01EF4321', 'Capital Freight', 'CF03', 'N', 16.0, 'NORTH', 'Delhi', 'OWNED'),
    ('TN09GH5678', 'Deccan Carriers', 'DC02', 'Y', 24.0, 'SOUTH', 'Chennai', 'LEASED');

INSERT INTO vts_alert_history
    (tl_number, violation_type, vts_end_datetime, location_name, speed_violation_count)
VALUES
    ('MH12AB1234', 'SPEED', '2026-08-20 11:30:00', 'NH48 Khandala', 3),
    ('MH12AB1234', 'ROUTE_DEVIATION', '2026-08-22 09:10:00', 'Lonavala bypass', 0),
    ('KA05CD9876', 'SPEED', '2026-08-25 15:45:00', 'NH44 Hosur', 1),
    ('TN09GH5678', 'DEVICE_TAMPER', '2026-08-26 22:05:00', 'Chennai port', 0);

INSERT INTO vts_ongoing_trips
    (tt_number, driver_name, violation_type, vehicle_location, invoice_number)
VALUES
    ('KA05CD9876', 'R. Patil', 'RD', 'Hosur toll plaza', 'INV-2041'),
    ('DL01EF4321', 'S. Verma', NULL, 'Gurugram depot', 'INV-2042');

INSERT INTO alerts (vehicle_number, alert_type, created_at)
VALUES
    ('MH12AB1234', 'SPEED', '2026-08-27 08:00:00'),
    ('KA05CD9876', 'ROUTE_DEVIATION', '2026-08-27 10:30:00'),
    ('KA05CD9876', 'SPEED', '2026-08-28 07:15:00');

INSERT OR REPLACE INTO tt_risk_score (tt_number, risk_score) VALUES
    ('MH12AB1234', 72.5),
    ('KA05CD9876', 38.0),
    ('DL01EF4321', 12.5),
    ('TN09GH5678', 64.0);

INSERT OR REPLACE INTO transporter_risk_score (transporter_name, risk_score) VALUES
    ('Sharma Logistics', 61.0),
    ('Deccan Carriers', 44.5),
    ('Capital Freight', 15.0);

INSERT INTO completed_trips_risk_score (tt_number, risk_score, trip_end_date) VALUES
    ('MH12AB1234', 68.0, '2026-07-30'),
    ('DL01EF4321', 10.0, '2026-08-01');

INSERT INTO vts_tripauditmaster (tt_number, audit_status, audited_at) VALUES
    ('MH12AB1234', 'FLAGGED', '2026-08-01 12:00:00'),
    ('KA05CD9876', 'CLEAR', '2026-08-05 12:00:00');
";
