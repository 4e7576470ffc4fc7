// CO-OPS client tests
// Uses mockito for HTTP mocking

mod common;

use chrono::{TimeZone as _, Utc};
use mockito::{Matcher, Server};
use storm_events::coops::{CoopsClient, CoopsQuery, Product, QueryOptions, StationType};
use storm_events::spatial::Region;

use common::{fixture, init_tracing, mock_config};

async fn mock_stations(server: &mut Server) -> mockito::Mock {
    server
        .mock("GET", "/nwsproducts.html")
        .match_query(Matcher::UrlEncoded("type".into(), "current".into()))
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(fixture("nwsproducts.html"))
        .create_async()
        .await
}

async fn mock_product(server: &mut Server, station: &str, body: &str) -> mockito::Mock {
    server
        .mock("GET", "/api/prod/datagetter")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("station".into(), station.into()),
            Matcher::UrlEncoded("product".into(), "water_level".into()),
            Matcher::UrlEncoded("format".into(), "json".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

fn florida() -> Region {
    Region::bounding_box(-83.0, 24.0, -79.0, 27.0)
}

#[tokio::test]
async fn test_current_stations() {
    init_tracing();
    let mut server = Server::new_async().await;
    let mock = mock_stations(&mut server).await;

    let client = CoopsClient::new(&mock_config(&server)).unwrap();
    let stations = client.stations(Some(StationType::Current)).await.unwrap();

    assert_eq!(stations.len(), 5);
    assert_eq!(stations[0].nos_id, 1612340);
    assert_eq!(stations[0].nws_id.as_deref(), Some("OOUH1"));
    assert!(stations.iter().all(|station| station.removed.is_none()));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_all_stations_include_historical() {
    let mut server = Server::new_async().await;
    let _mock = mock_stations(&mut server).await;

    let client = CoopsClient::new(&mock_config(&server)).unwrap();
    let stations = client.stations(None).await.unwrap();

    assert_eq!(stations.len(), 8);
    let historical: Vec<_> = stations
        .iter()
        .filter(|station| station.station_type == StationType::Historical)
        .collect();
    assert_eq!(historical.len(), 3);
    assert!(historical.iter().all(|station| station.removed.is_some()));
}

#[tokio::test]
async fn test_stations_within_region_deduplicated() {
    let mut server = Server::new_async().await;
    let _mock = mock_stations(&mut server).await;

    let client = CoopsClient::new(&mock_config(&server)).unwrap();
    let stations = client.stations_within_region(&florida(), None).await.unwrap();

    let ids: Vec<i64> = stations.iter().map(|station| station.nos_id).collect();
    // Key West is listed as both current and historical
    assert_eq!(ids, vec![8723214, 8724580, 8725110]);
    assert!(stations
        .iter()
        .all(|station| station.station_type == StationType::Current));
}

#[tokio::test]
async fn test_product_series() {
    let mut server = Server::new_async().await;
    let mock = mock_product(&mut server, "8724580", &fixture("water_level_8724580.json")).await;

    let client = CoopsClient::new(&mock_config(&server)).unwrap();
    let query = CoopsQuery::new(
        "8724580",
        Utc.with_ymd_and_hms(2017, 9, 10, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2017, 9, 10, 18, 0, 0).unwrap(),
    );
    let series = client.product(&query).await.unwrap();

    assert_eq!(series.station, "8724580");
    assert_eq!(series.readings.len(), 4);
    assert_eq!(series.readings[2].value, Some(1.221));
    assert_eq!(series.readings[3].value, None);
    assert_eq!(series.readings[3].flags.as_deref(), Some("1,0,0,0"));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_product_without_data_is_empty() {
    let mut server = Server::new_async().await;
    let _mock = mock_product(&mut server, "8725110", &fixture("no_data.json")).await;

    let client = CoopsClient::new(&mock_config(&server)).unwrap();
    let query = CoopsQuery::new(
        "8725110",
        Utc.with_ymd_and_hms(2017, 9, 10, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2017, 9, 11, 0, 0, 0).unwrap(),
    );
    let series = client.product(&query).await.unwrap();
    assert!(series.is_empty());
}

#[tokio::test]
async fn test_data_within_region() {
    init_tracing();
    let mut server = Server::new_async().await;
    let _stations = mock_stations(&mut server).await;
    let virginia_key =
        mock_product(&mut server, "8723214", &fixture("water_level_8723214.json")).await;
    let key_west = mock_product(&mut server, "8724580", &fixture("water_level_8724580.json")).await;
    let naples = mock_product(&mut server, "8725110", &fixture("no_data.json")).await;

    let client = CoopsClient::new(&mock_config(&server)).unwrap();
    let dataset = client
        .data_within_region(
            &florida(),
            Utc.with_ymd_and_hms(2017, 9, 10, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2017, 9, 10, 18, 0, 0).unwrap(),
            QueryOptions::product(Product::WaterLevel),
            Some(StationType::Current),
        )
        .await
        .unwrap();

    // Naples has no data and is left out
    assert_eq!(dataset.stations.len(), 2);
    assert!(dataset.station("8725110").is_none());
    assert_eq!(dataset.times.len(), 5);

    let six = Utc.with_ymd_and_hms(2017, 9, 10, 6, 0, 0).unwrap();
    let nine = Utc.with_ymd_and_hms(2017, 9, 10, 9, 0, 0).unwrap();
    assert_eq!(dataset.value("8723214", six), Some(1.034));
    assert_eq!(dataset.value("8724580", six), Some(0.788));
    assert_eq!(dataset.value("8724580", nine), None);
    assert_eq!(dataset.value("8723214", nine), Some(1.402));

    virginia_key.assert_async().await;
    key_west.assert_async().await;
    naples.assert_async().await;
}

#[tokio::test]
async fn test_empty_region_requests_no_data() {
    let mut server = Server::new_async().await;
    let _stations = mock_stations(&mut server).await;
    let data = server
        .mock("GET", "/api/prod/datagetter")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = CoopsClient::new(&mock_config(&server)).unwrap();
    // open Atlantic
    let region = Region::bounding_box(-50.0, 30.0, -45.0, 35.0);
    let dataset = client
        .data_within_region(
            &region,
            Utc.with_ymd_and_hms(2017, 9, 10, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2017, 9, 11, 0, 0, 0).unwrap(),
            QueryOptions::default(),
            None,
        )
        .await
        .unwrap();

    assert!(dataset.is_empty());
    data.assert_async().await;
}

#[tokio::test]
async fn test_constituents() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/harcon.html")
        .match_query(Matcher::UrlEncoded("id".into(), "8724580".into()))
        .with_status(200)
        .with_body(fixture("harcon_8724580.html"))
        .create_async()
        .await;

    let client = CoopsClient::new(&mock_config(&server)).unwrap();
    let constituents = client.constituents("8724580").await.unwrap();

    let names: Vec<&str> = constituents.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["M2", "S2", "N2", "K1"]);
    assert_eq!(constituents[0].amplitude, 0.575);
    assert_eq!(constituents[3].speed, 15.041069);

    mock.assert_async().await;
}
